//! Serde mirror of the on-disk YAML spec.

use std::collections::BTreeMap;
use std::path::PathBuf;

use noodles_core::ErrorHandler;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

/// A value that may be written as a scalar or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

/// A requirement group mapping, or an ordered list of them.
///
/// Groups keep the key order of the spec file, so requirements inside a
/// group are checked in the order they were written.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum GroupList {
    One(Mapping),
    Many(Vec<Mapping>),
}

impl GroupList {
    pub(crate) fn into_groups(self) -> Vec<Vec<(String, String)>> {
        fn entries(mapping: Mapping) -> Vec<(String, String)> {
            mapping
                .into_iter()
                .map(|(key, value)| (value_to_string(&key), value_to_string(&value)))
                .collect()
        }

        match self {
            GroupList::One(group) => vec![entries(group)],
            GroupList::Many(groups) => groups.into_iter().map(entries).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawOutputs {
    #[serde(default)]
    pub(crate) stdout: Option<PathBuf>,
    #[serde(default)]
    pub(crate) stderr: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawExperiment {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    pub(crate) description: Option<String>,
    /// Values may be YAML scalars of any kind; they are stringified.
    #[serde(default)]
    pub(crate) envs: BTreeMap<String, Value>,
    /// Command type to its command line(s).
    #[serde(default)]
    pub(crate) commands: BTreeMap<String, OneOrMany<String>>,
    /// Command type to its requirement group(s).
    #[serde(default)]
    pub(crate) requirements: BTreeMap<String, GroupList>,
    #[serde(default)]
    pub(crate) depends_on: Option<OneOrMany<String>>,
    /// Command type to its stdout/stderr redirection targets.
    #[serde(default)]
    pub(crate) write_outputs: BTreeMap<String, RawOutputs>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawServer {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) hostname: Option<String>,
    #[serde(default)]
    pub(crate) username: Option<String>,
    #[serde(default)]
    pub(crate) port: Option<u16>,
    #[serde(default)]
    pub(crate) private_key_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawSpec {
    #[serde(default)]
    #[allow(dead_code)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    pub(crate) description: Option<String>,

    #[serde(default)]
    pub(crate) round_interval: Option<f64>,
    #[serde(default)]
    pub(crate) deployment_interval: Option<f64>,
    #[serde(default)]
    pub(crate) check_any_errors: Option<bool>,
    #[serde(default)]
    pub(crate) max_retries: Option<u32>,
    #[serde(default)]
    pub(crate) error_handlers: Vec<ErrorHandler>,

    #[serde(default)]
    pub(crate) before_all_experiments: Option<RawExperiment>,
    #[serde(default)]
    pub(crate) experiment_default: Option<RawExperiment>,
    #[serde(default)]
    pub(crate) experiments: Vec<RawExperiment>,
    #[serde(default)]
    pub(crate) after_all_experiments: Option<RawExperiment>,

    #[serde(default)]
    pub(crate) servers: Vec<RawServer>,
    /// Requirement ID to the probe command line(s) measuring it.
    #[serde(default)]
    pub(crate) requirements: BTreeMap<String, OneOrMany<String>>,
    /// Command type to the status snapshot output path.
    #[serde(default)]
    pub(crate) status: BTreeMap<String, PathBuf>,
}

/// Stringify a YAML scalar the way the shell will see it.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim_end()
            .to_string(),
    }
}
