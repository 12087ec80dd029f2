//! Probing requirements and narrowing candidate servers.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::bail;
use noodles_core::{
    Action, Command, Error, Experiment, Metric, OutputFiles, Refresh, RunOptions, Server,
};
use noodles_remote::{CommandExecutor, Dispatcher};
use tracing::debug;

use crate::cache::MetricCache;
use crate::retry::RetryBudget;

/// Evaluates an experiment's requirement groups against the server list.
///
/// Groups are applied in order and each group narrows the candidate set
/// further; as soon as no candidates remain, the remaining groups are
/// skipped. Servers already holding a deployment in the current round are
/// never probed and never satisfy anything.
pub struct RequirementEngine<'a> {
    servers: &'a [Server],
    requirements: &'a BTreeMap<String, Vec<Command>>,
    options: &'a RunOptions,
    dispatcher: Dispatcher<'a>,
}

impl<'a> RequirementEngine<'a> {
    /// Create an engine over the plan's servers and requirement probes.
    pub fn new(
        servers: &'a [Server],
        requirements: &'a BTreeMap<String, Vec<Command>>,
        options: &'a RunOptions,
        executor: &'a dyn CommandExecutor,
    ) -> RequirementEngine<'a> {
        RequirementEngine {
            servers,
            requirements,
            options,
            dispatcher: Dispatcher::new(executor),
        }
    }

    /// Indices of the servers that satisfy every requirement group of the
    /// experiment, minus the servers in `deployed`.
    ///
    /// Dynamic requirements are re-probed on every call. A static
    /// measurement is taken once per server: servers that were skipped when
    /// the requirement was first looked up (busy at the time) are measured
    /// on a later lookup, so a cached `None` slot never starves a server
    /// for the rest of the stage.
    pub async fn find_satisfied_servers(
        &self,
        experiment: &Experiment,
        cache: &mut MetricCache,
        deployed: &BTreeSet<usize>,
    ) -> Result<BTreeSet<usize>, anyhow::Error> {
        let mut candidates: BTreeSet<usize> = (0..self.servers.len()).collect();

        'groups: for group in &experiment.requirement_groups {
            for (key, expression) in group {
                if candidates.is_empty() {
                    break 'groups;
                }

                let needs_probe = match key.refresh {
                    Refresh::Dynamic => true,
                    Refresh::Static => match cache.get(&key.id) {
                        None => true,
                        Some(metrics) => metrics
                            .iter()
                            .enumerate()
                            .any(|(idx, metric)| metric.is_none() && !deployed.contains(&idx)),
                    },
                };

                if needs_probe {
                    // Static lookups keep the measurements they already
                    // have and only fill the missing slots.
                    let previous = match key.refresh {
                        Refresh::Static => cache.get(&key.id).map(<[_]>::to_vec),
                        Refresh::Dynamic => None,
                    };
                    let metrics = self
                        .probe(&key.id, &experiment.envs, deployed, previous.as_deref())
                        .await?;
                    cache.insert(&key.id, metrics);
                }
                let metrics = match cache.get(&key.id) {
                    Some(metrics) => metrics,
                    None => bail!("metrics for requirement {:?} missing after probe", key.id),
                };

                let mut kept = BTreeSet::new();
                for &idx in &candidates {
                    if let Some(metric) = &metrics[idx] {
                        if metric.satisfies(expression.op, &expression.value)? {
                            kept.insert(idx);
                        }
                    }
                }

                debug!(
                    experiment = %experiment.name,
                    requirement = %key.id,
                    kept = kept.len(),
                    "Narrow candidate servers"
                );
                candidates = kept;
            }
        }

        Ok(&candidates - deployed)
    }

    /// Measure one requirement on every non-deployed server, reusing any
    /// measurement `previous` already holds for a server.
    ///
    /// A `continue`-classified probe yields no metric for that server; a
    /// `retry` classification re-runs the probe against the attempt budget.
    async fn probe(
        &self,
        id: &str,
        envs: &BTreeMap<String, String>,
        deployed: &BTreeSet<usize>,
        previous: Option<&[Option<Metric>]>,
    ) -> Result<Vec<Option<Metric>>, anyhow::Error> {
        let commands = self
            .requirements
            .get(id)
            .ok_or_else(|| Error::UnknownRequirement(id.to_string()))?;

        let mut metrics = Vec::with_capacity(self.servers.len());
        for (idx, server) in self.servers.iter().enumerate() {
            if let Some(metric) = previous.and_then(|p| p.get(idx)).and_then(Option::as_ref) {
                metrics.push(Some(metric.clone()));
                continue;
            }
            if deployed.contains(&idx) {
                metrics.push(None);
                continue;
            }

            let mut budget = RetryBudget::new(self.options.max_retries);
            let metric = loop {
                let (action, stdout) = self
                    .dispatcher
                    .run_classified(
                        Some(server),
                        commands,
                        envs,
                        &OutputFiles::default(),
                        self.options,
                    )
                    .await?;

                match action {
                    Action::Success => break Some(Metric::evaluate(&stdout)),
                    Action::Continue => break None,
                    Action::Retry => {
                        budget.spend()?;
                        debug!(requirement = id, server = %server.name, "Retry the probe");
                    }
                    Action::Abort => {
                        bail!("probe aborted for requirement {:?} on {:?}", id, server.name)
                    }
                }
            };

            if let Some(metric) = &metric {
                debug!(requirement = id, server = %server.name, metric = %metric.render(), "Probed");
            }
            metrics.push(metric);
        }

        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{clean, failing, ScriptedExecutor};
    use noodles_core::{CommandScheme, ErrorHandler, Expression, RequirementKey};

    fn servers(names: &[(&str, &str)]) -> Vec<Server> {
        names
            .iter()
            .map(|(name, hostname)| Server {
                name: name.to_string(),
                hostname: Some(hostname.to_string()),
                ..Default::default()
            })
            .collect()
    }

    fn probes(entries: &[(&str, &str)]) -> BTreeMap<String, Vec<Command>> {
        entries
            .iter()
            .map(|(id, line)| {
                let command = Command {
                    scheme: CommandScheme::Remote,
                    line: line.to_string(),
                };
                (id.to_string(), vec![command])
            })
            .collect()
    }

    fn experiment_requiring(groups: &[&[(&str, &str)]]) -> Experiment {
        Experiment {
            name: "exp".to_string(),
            commands: vec![Command {
                scheme: CommandScheme::Remote,
                line: "true".to_string(),
            }],
            envs: BTreeMap::new(),
            requirement_groups: groups
                .iter()
                .map(|group| {
                    group
                        .iter()
                        .map(|(key, expr)| {
                            (
                                RequirementKey::parse(key).unwrap(),
                                Expression::parse(expr).unwrap(),
                            )
                        })
                        .collect()
                })
                .collect(),
            depends_on: Vec::new(),
            outputs: OutputFiles::default(),
        }
    }

    #[tokio::test]
    async fn test_no_requirements_keeps_all_non_deployed_servers() {
        let executor = ScriptedExecutor::new(|_, _| clean(""));
        let servers = servers(&[("a", "a.example"), ("b", "b.example"), ("c", "c.example")]);
        let requirements = BTreeMap::new();
        let options = RunOptions::default();
        let engine = RequirementEngine::new(&servers, &requirements, &options, &executor);

        let deployed: BTreeSet<usize> = [1].into_iter().collect();
        let satisfied = engine
            .find_satisfied_servers(
                &experiment_requiring(&[]),
                &mut MetricCache::new(),
                &deployed,
            )
            .await
            .unwrap();

        assert_eq!(satisfied, [0, 2].into_iter().collect());
        assert!(executor.scripts().is_empty());
    }

    #[tokio::test]
    async fn test_filters_by_metric_and_excludes_deployed() {
        let executor = ScriptedExecutor::new(|endpoint, _| {
            match crate::testing::authority_of(endpoint).as_str() {
                "a.example" => clean("8\n"),
                "b.example" => clean("2\n"),
                _ => clean("16\n"),
            }
        });
        let servers = servers(&[("a", "a.example"), ("b", "b.example"), ("c", "c.example")]);
        let requirements = probes(&[("cpu_count", "nproc")]);
        let options = RunOptions::default();
        let engine = RequirementEngine::new(&servers, &requirements, &options, &executor);

        let deployed: BTreeSet<usize> = [2].into_iter().collect();
        let satisfied = engine
            .find_satisfied_servers(
                &experiment_requiring(&[&[("cpu_count", ">=4")]]),
                &mut MetricCache::new(),
                &deployed,
            )
            .await
            .unwrap();

        // Server c would satisfy but already holds a deployment.
        assert_eq!(satisfied, [0].into_iter().collect());
        // Deployed servers are not probed at all.
        assert_eq!(executor.scripts().len(), 2);
    }

    #[tokio::test]
    async fn test_static_requirement_is_probed_once() {
        let executor = ScriptedExecutor::new(|_, _| clean("100\n"));
        let servers = servers(&[("a", "a.example")]);
        let requirements = probes(&[("disk_space", "df --output=avail /")]);
        let options = RunOptions::default();
        let engine = RequirementEngine::new(&servers, &requirements, &options, &executor);

        let experiment = experiment_requiring(&[&[("static:disk_space", ">=1")]]);
        let mut cache = MetricCache::new();
        let deployed = BTreeSet::new();

        for _ in 0..3 {
            let satisfied = engine
                .find_satisfied_servers(&experiment, &mut cache, &deployed)
                .await
                .unwrap();
            assert_eq!(satisfied, [0].into_iter().collect());
        }

        assert_eq!(executor.scripts().len(), 1);
    }

    #[tokio::test]
    async fn test_static_slot_skipped_while_busy_is_measured_later() {
        let executor = ScriptedExecutor::new(|endpoint, _| {
            match crate::testing::authority_of(endpoint).as_str() {
                "a.example" => clean("100\n"),
                _ => clean("0\n"),
            }
        });
        let servers = servers(&[("a", "a.example"), ("b", "b.example")]);
        let requirements = probes(&[("disk_space", "df --output=avail /")]);
        let options = RunOptions::default();
        let engine = RequirementEngine::new(&servers, &requirements, &options, &executor);

        let experiment = experiment_requiring(&[&[("static:disk_space", ">=1")]]);
        let mut cache = MetricCache::new();

        // Server a is busy on the first lookup, so only b is measured.
        let busy: BTreeSet<usize> = [0].into_iter().collect();
        let first = engine
            .find_satisfied_servers(&experiment, &mut cache, &busy)
            .await
            .unwrap();
        assert!(first.is_empty());

        // Once a is free it gets its measurement and satisfies the
        // requirement; b's cached value is reused.
        let second = engine
            .find_satisfied_servers(&experiment, &mut cache, &BTreeSet::new())
            .await
            .unwrap();
        assert_eq!(second, [0].into_iter().collect());
        assert_eq!(executor.scripts().len(), 2);
    }

    #[tokio::test]
    async fn test_dynamic_requirement_is_probed_every_time() {
        let executor = ScriptedExecutor::new(|_, _| clean("0.5\n"));
        let servers = servers(&[("a", "a.example")]);
        let requirements = probes(&[("cpu_usage", "uptime")]);
        let options = RunOptions::default();
        let engine = RequirementEngine::new(&servers, &requirements, &options, &executor);

        let experiment = experiment_requiring(&[&[("cpu_usage", "<=20")]]);
        let mut cache = MetricCache::new();
        let deployed = BTreeSet::new();

        for _ in 0..3 {
            engine
                .find_satisfied_servers(&experiment, &mut cache, &deployed)
                .await
                .unwrap();
        }

        assert_eq!(executor.scripts().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_requirement_id_is_fatal() {
        let executor = ScriptedExecutor::new(|_, _| clean(""));
        let servers = servers(&[("a", "a.example")]);
        let requirements = BTreeMap::new();
        let options = RunOptions::default();
        let engine = RequirementEngine::new(&servers, &requirements, &options, &executor);

        let outcome = engine
            .find_satisfied_servers(
                &experiment_requiring(&[&[("gpu_usage", "<=10")]]),
                &mut MetricCache::new(),
                &BTreeSet::new(),
            )
            .await;

        let message = outcome.unwrap_err().to_string();
        assert!(message.contains("requirement ID does not exist"));
    }

    #[tokio::test]
    async fn test_continue_probe_disqualifies_the_server() {
        let executor = ScriptedExecutor::new(|endpoint, _| {
            match crate::testing::authority_of(endpoint).as_str() {
                "a.example" => failing(1, "nvidia-smi: not found"),
                _ => clean("3\n"),
            }
        });
        let servers = servers(&[("a", "a.example"), ("b", "b.example")]);
        let requirements = probes(&[("gpu_count", "nvidia-smi -L | wc -l")]);
        let options = RunOptions {
            error_handlers: vec![ErrorHandler {
                name: "no gpu".to_string(),
                return_code: None,
                stderr_pattern: Some(".*not found".to_string()),
                action: Action::Continue,
            }],
            ..Default::default()
        };
        let engine = RequirementEngine::new(&servers, &requirements, &options, &executor);

        let satisfied = engine
            .find_satisfied_servers(
                &experiment_requiring(&[&[("gpu_count", ">=1")]]),
                &mut MetricCache::new(),
                &BTreeSet::new(),
            )
            .await
            .unwrap();

        assert_eq!(satisfied, [1].into_iter().collect());
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_is_fatal() {
        let executor = ScriptedExecutor::new(|_, _| failing(7, ""));
        let servers = servers(&[("a", "a.example")]);
        let requirements = probes(&[("cpu_usage", "uptime")]);
        let options = RunOptions {
            error_handlers: vec![ErrorHandler {
                name: "flaky probe".to_string(),
                return_code: Some(noodles_core::ReturnCodeMatcher::Literal(7)),
                stderr_pattern: None,
                action: Action::Retry,
            }],
            max_retries: Some(2),
            ..Default::default()
        };
        let engine = RequirementEngine::new(&servers, &requirements, &options, &executor);

        let outcome = engine
            .find_satisfied_servers(
                &experiment_requiring(&[&[("cpu_usage", "<=20")]]),
                &mut MetricCache::new(),
                &BTreeSet::new(),
            )
            .await;

        let message = outcome.unwrap_err().to_string();
        assert!(message.contains("retry budget exhausted"));
        // Initial attempt plus two retries.
        assert_eq!(executor.scripts().len(), 3);
    }
}
