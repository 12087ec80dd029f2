//! Spec resolution into a [`RunPlan`].

use std::collections::BTreeMap;
use std::path::Path;

use noodles_core::{
    Command, Experiment, Expression, OutputFiles, RequirementKey, RunOptions, RunPlan, Server,
};
use thiserror::Error;
use tracing::debug;

use crate::raw::{value_to_string, RawExperiment, RawSpec};

/// Errors produced while loading or resolving a spec file.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The spec file could not be read.
    #[error("could not read the spec file {path}")]
    Io {
        /// Offending path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The spec file is not valid YAML.
    #[error("could not parse the spec file")]
    Yaml(#[from] serde_yaml::Error),

    /// A spec value failed to resolve into its typed form.
    #[error("invalid spec value at {context}")]
    Invalid {
        /// The spec key being resolved.
        context: String,
        /// Underlying resolution error.
        #[source]
        source: noodles_core::Error,
    },
}

/// Read a spec file and resolve it for one command type.
pub fn load_plan(path: &Path, command_type: &str) -> Result<RunPlan, SpecError> {
    let text = std::fs::read_to_string(path).map_err(|source| SpecError::Io {
        path: path.display().to_string(),
        source,
    })?;
    plan_from_str(&text, command_type)
}

/// Resolve spec YAML text for one command type.
pub fn plan_from_str(yaml: &str, command_type: &str) -> Result<RunPlan, SpecError> {
    let raw: RawSpec = serde_yaml::from_str(yaml)?;
    resolve(raw, command_type)
}

fn resolve(raw: RawSpec, command_type: &str) -> Result<RunPlan, SpecError> {
    let options = RunOptions {
        round_interval: raw.round_interval.unwrap_or(0.0),
        deployment_interval: raw.deployment_interval.unwrap_or(0.0),
        check_any_errors: raw.check_any_errors.unwrap_or(true),
        error_handlers: raw.error_handlers,
        max_retries: raw.max_retries,
    };

    let servers: Vec<Server> = raw
        .servers
        .into_iter()
        .map(|server| Server {
            name: server.name.unwrap_or_default(),
            hostname: server.hostname,
            username: server.username,
            port: server.port,
            private_key_path: server.private_key_path,
        })
        .collect();

    let mut requirements = BTreeMap::new();
    for (id, lines) in raw.requirements {
        let commands =
            Command::parse_all(&lines.into_vec()).map_err(|source| SpecError::Invalid {
                context: format!("requirements.{}", id),
                source,
            })?;
        requirements.insert(id, commands);
    }

    let default = raw.experiment_default;

    let mut experiments = Vec::with_capacity(raw.experiments.len());
    for (idx, exp) in raw.experiments.into_iter().enumerate() {
        experiments.push(resolve_experiment(
            exp,
            default.as_ref(),
            command_type,
            &format!("experiments[{}]", idx),
        )?);
    }

    // The bracketing stages describe themselves completely;
    // experiment_default applies to the main experiment list only.
    let before_all = raw
        .before_all_experiments
        .map(|exp| resolve_experiment(exp, None, command_type, "before_all_experiments"))
        .transpose()?;
    let after_all = raw
        .after_all_experiments
        .map(|exp| resolve_experiment(exp, None, command_type, "after_all_experiments"))
        .transpose()?;

    let status_path = raw.status.get(command_type).cloned();

    debug!(
        command_type,
        experiments = experiments.len(),
        servers = servers.len(),
        "Resolved run plan"
    );

    Ok(RunPlan {
        options,
        servers,
        requirements,
        before_all,
        experiments,
        after_all,
        status_path,
    })
}

/// Resolve one experiment for the active command type.
///
/// A detail (commands, envs, requirements) that is empty for this
/// experiment falls back to `experiment_default`'s detail; `depends_on` and
/// `write_outputs` never fall back.
fn resolve_experiment(
    exp: RawExperiment,
    default: Option<&RawExperiment>,
    command_type: &str,
    context: &str,
) -> Result<Experiment, SpecError> {
    let mut command_lines: Vec<String> = exp
        .commands
        .get(command_type)
        .cloned()
        .map(|lines| lines.into_vec())
        .unwrap_or_default();
    if command_lines.is_empty() {
        if let Some(default) = default {
            command_lines = default
                .commands
                .get(command_type)
                .cloned()
                .map(|lines| lines.into_vec())
                .unwrap_or_default();
        }
    }
    let commands = Command::parse_all(&command_lines).map_err(|source| SpecError::Invalid {
        context: format!("{}.commands.{}", context, command_type),
        source,
    })?;

    let mut raw_envs = exp.envs;
    if raw_envs.is_empty() {
        if let Some(default) = default {
            raw_envs = default.envs.clone();
        }
    }
    let envs: BTreeMap<String, String> = raw_envs
        .iter()
        .map(|(key, value)| (key.clone(), value_to_string(value)))
        .collect();

    let mut raw_groups = exp
        .requirements
        .get(command_type)
        .cloned()
        .map(|groups| groups.into_groups())
        .unwrap_or_default();
    if raw_groups.is_empty() {
        if let Some(default) = default {
            raw_groups = default
                .requirements
                .get(command_type)
                .cloned()
                .map(|groups| groups.into_groups())
                .unwrap_or_default();
        }
    }

    let mut requirement_groups = Vec::with_capacity(raw_groups.len());
    for group in raw_groups {
        let mut resolved = Vec::with_capacity(group.len());
        for (raw_key, raw_expr) in group {
            let key = RequirementKey::parse(&raw_key).map_err(|source| SpecError::Invalid {
                context: format!("{}.requirements.{}", context, raw_key),
                source,
            })?;
            let expr = Expression::parse(&raw_expr).map_err(|source| SpecError::Invalid {
                context: format!("{}.requirements.{}", context, raw_key),
                source,
            })?;
            resolved.push((key, expr));
        }
        requirement_groups.push(resolved);
    }

    let outputs = exp
        .write_outputs
        .get(command_type)
        .map(|raw| OutputFiles {
            stdout: raw.stdout.clone(),
            stderr: raw.stderr.clone(),
        })
        .unwrap_or_default();

    Ok(Experiment {
        name: exp.name.unwrap_or_default(),
        commands,
        envs,
        requirement_groups,
        depends_on: exp
            .depends_on
            .map(|names| names.into_vec())
            .unwrap_or_default(),
        outputs,
    })
}
