//! Round-based placement of experiments onto satisfied servers.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use anyhow::bail;
use noodles_core::{Action, ExpId, Experiment, RunPlan, Server};
use noodles_remote::{CommandExecutor, Dispatcher};
use tracing::{debug, info, warn};

use crate::cache::MetricCache;
use crate::requirement::RequirementEngine;
use crate::retry::RetryBudget;
use crate::status::StatusReporter;

/// The three stages of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The optional `before_all_experiments` experiment.
    BeforeAll,
    /// The main experiment list.
    Experiments,
    /// The optional `after_all_experiments` experiment.
    AfterAll,
}

impl Stage {
    fn name(self) -> &'static str {
        match self {
            Stage::BeforeAll => "before_all_experiments",
            Stage::Experiments => "experiments",
            Stage::AfterAll => "after_all_experiments",
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Main-stage experiments that were deployed, `continue`d ones included.
    pub deployed: usize,
    /// Main-stage experiment count.
    pub total: usize,
    /// Wall-clock duration of the whole run.
    pub elapsed: Duration,
}

/// Drives a [`RunPlan`] to completion against a command executor.
///
/// Each stage loops placement rounds until every experiment of the stage is
/// deployed. Within a round, experiments are visited in spec order; each one
/// goes to the lowest-indexed server satisfying its requirements, and a
/// server accepts at most one deployment per round.
pub struct Scheduler<'a> {
    plan: &'a RunPlan,
    executor: &'a dyn CommandExecutor,
    reporter: Option<StatusReporter>,
}

impl<'a> Scheduler<'a> {
    /// Create a scheduler for a plan. A status reporter is attached when
    /// the plan carries a status path.
    pub fn new(plan: &'a RunPlan, executor: &'a dyn CommandExecutor) -> Scheduler<'a> {
        let reporter = plan.status_path.clone().map(StatusReporter::new);
        Scheduler {
            plan,
            executor,
            reporter,
        }
    }

    /// Run all three stages and return the main-stage summary.
    pub async fn run(&self) -> Result<RunSummary, anyhow::Error> {
        let start = Instant::now();

        self.deploy_stage(Stage::BeforeAll).await?;
        let (deployed, total) = self.deploy_stage(Stage::Experiments).await?;
        self.deploy_stage(Stage::AfterAll).await?;

        Ok(RunSummary {
            deployed,
            total,
            elapsed: start.elapsed(),
        })
    }

    fn stage_experiments(&self, stage: Stage) -> &[Experiment] {
        match stage {
            Stage::BeforeAll => opt_slice(&self.plan.before_all),
            Stage::Experiments => &self.plan.experiments,
            Stage::AfterAll => opt_slice(&self.plan.after_all),
        }
    }

    async fn deploy_stage(&self, stage: Stage) -> Result<(usize, usize), anyhow::Error> {
        let experiments = self.stage_experiments(stage);
        if experiments.is_empty() {
            return Ok((0, 0));
        }

        info!(stage = stage.name(), count = experiments.len(), "Start stage");

        let engine = RequirementEngine::new(
            &self.plan.servers,
            &self.plan.requirements,
            &self.plan.options,
            self.executor,
        );

        let mut undeployed: BTreeSet<ExpId> = (0..experiments.len()).map(ExpId).collect();
        let mut deployed_names: BTreeSet<String> = BTreeSet::new();
        let mut cache = MetricCache::new();
        let mut deployed_total = 0;
        let mut round = 0usize;

        while !undeployed.is_empty() {
            if round > 0 {
                sleep_secs(self.plan.options.round_interval).await;
            }
            round += 1;

            let round_start = Instant::now();
            let names: Vec<&str> = undeployed
                .iter()
                .map(|id| experiments[id.0].name.as_str())
                .collect();
            info!(stage = stage.name(), round, undeployed = ?names, "Start round");

            let accepted = self
                .deploy_round(
                    stage,
                    round,
                    experiments,
                    &undeployed,
                    &mut deployed_names,
                    &mut cache,
                    &engine,
                )
                .await?;

            deployed_total += accepted.len();
            undeployed.retain(|id| !accepted.contains(id));

            debug!(
                stage = stage.name(),
                round,
                elapsed = ?round_start.elapsed(),
                "Finish round"
            );
        }

        info!(stage = stage.name(), rounds = round, "Finish stage");
        Ok((deployed_total, experiments.len()))
    }

    /// One placement pass over the undeployed experiments.
    ///
    /// Returns the IDs accepted this round. A `retry` classification leaves
    /// the experiment undeployed for the next round; the pass ends early
    /// once every server holds a deployment.
    #[allow(clippy::too_many_arguments)]
    async fn deploy_round(
        &self,
        stage: Stage,
        round: usize,
        experiments: &[Experiment],
        undeployed: &BTreeSet<ExpId>,
        deployed_names: &mut BTreeSet<String>,
        cache: &mut MetricCache,
        engine: &RequirementEngine<'_>,
    ) -> Result<BTreeSet<ExpId>, anyhow::Error> {
        let mut accepted: BTreeSet<ExpId> = BTreeSet::new();
        let mut deployed_servers: BTreeSet<usize> = BTreeSet::new();
        let mut placements = 0usize;

        for id in undeployed {
            let experiment = &experiments[id.0];

            if experiment.is_empty() {
                debug!(experiment = %experiment.name, "Nothing to run; mark deployed");
                accepted.insert(*id);
                deployed_names.insert(experiment.name.clone());
                continue;
            }

            if let Some(missing) = experiment
                .depends_on
                .iter()
                .find(|name| !deployed_names.contains(*name))
            {
                debug!(
                    experiment = %experiment.name,
                    waiting_on = %missing,
                    "Dependency not deployed yet"
                );
                continue;
            }

            let satisfied = engine
                .find_satisfied_servers(experiment, cache, &deployed_servers)
                .await?;
            debug!(
                experiment = %experiment.name,
                satisfied = satisfied.len(),
                "Satisfied servers"
            );

            if let Some(&server_idx) = satisfied.iter().next() {
                if placements > 0 {
                    sleep_secs(self.plan.options.deployment_interval).await;
                }

                let server = &self.plan.servers[server_idx];
                info!(experiment = %experiment.name, server = %server.name, "Deploy experiment");

                match self.deploy_to_server(experiment, server).await? {
                    Action::Success => {
                        accepted.insert(*id);
                        deployed_servers.insert(server_idx);
                        deployed_names.insert(experiment.name.clone());
                        placements += 1;
                    }
                    Action::Continue => {
                        warn!(experiment = %experiment.name, "Give up the deployment and continue");
                        accepted.insert(*id);
                        deployed_names.insert(experiment.name.clone());
                        placements += 1;
                    }
                    Action::Retry => {
                        warn!(experiment = %experiment.name, "Deployment deferred to the next round");
                    }
                    Action::Abort => {
                        bail!("deployment aborted for experiment {:?}", experiment.name)
                    }
                }

                if stage == Stage::Experiments && accepted.contains(id) {
                    self.report_status(round, experiments, undeployed, &accepted);
                }
            }

            if deployed_servers.len() >= self.plan.servers.len() {
                debug!("No servers remain available in this round");
                break;
            }
        }

        Ok(accepted)
    }

    /// Dispatch an experiment's commands to a server and classify the
    /// outcome.
    async fn deploy_to_server(
        &self,
        experiment: &Experiment,
        server: &Server,
    ) -> Result<Action, anyhow::Error> {
        let dispatcher = Dispatcher::new(self.executor);

        let mut envs = experiment.envs.clone();
        envs.extend(self.server_envs(experiment, server).await?);

        let (action, stdout) = dispatcher
            .run_classified(
                Some(server),
                &experiment.commands,
                &envs,
                &experiment.outputs,
                &self.plan.options,
            )
            .await?;

        if !stdout.is_empty() {
            info!(experiment = %experiment.name, "Deployment output:\n{}", stdout.trim_end());
        }

        Ok(action)
    }

    /// Server descriptors injected as `NOODLES_*` environment variables.
    ///
    /// A value starting with `$` is first evaluated through the local shell
    /// with the experiment's own variables exported, so a spec can route
    /// hostnames, ports, or key paths through user-level indirection.
    async fn server_envs(
        &self,
        experiment: &Experiment,
        server: &Server,
    ) -> Result<BTreeMap<String, String>, anyhow::Error> {
        let dispatcher = Dispatcher::new(self.executor);

        let mut envs = BTreeMap::new();
        envs.insert(
            "NOODLES_EXPERIMENT_NAME".to_string(),
            experiment.name.clone(),
        );
        envs.insert("NOODLES_SERVER_NAME".to_string(), server.name.clone());
        envs.insert(
            "NOODLES_SERVER_HOSTNAME".to_string(),
            server.hostname.clone().unwrap_or_default(),
        );
        envs.insert(
            "NOODLES_SERVER_USERNAME".to_string(),
            server.username.clone().unwrap_or_default(),
        );
        envs.insert(
            "NOODLES_SERVER_PORT".to_string(),
            server.port.map(|port| port.to_string()).unwrap_or_default(),
        );
        envs.insert(
            "NOODLES_SERVER_PRIVATE_KEY_PATH".to_string(),
            server.private_key_path.clone().unwrap_or_default(),
        );
        envs.insert("NOODLES_SERVER_AUTHORITY".to_string(), server.authority());

        for value in envs.values_mut() {
            if !value.starts_with('$') {
                continue;
            }

            let mut budget = RetryBudget::new(self.plan.options.max_retries);
            loop {
                let (action, stdout) = dispatcher
                    .evaluate_local(value, &experiment.envs, &self.plan.options)
                    .await?;
                match action {
                    Action::Success => {
                        *value = stdout;
                        break;
                    }
                    Action::Continue => break,
                    Action::Retry => budget.spend()?,
                    Action::Abort => bail!("evaluation aborted for {:?}", value),
                }
            }
        }

        Ok(envs)
    }

    fn report_status(
        &self,
        round: usize,
        experiments: &[Experiment],
        undeployed: &BTreeSet<ExpId>,
        accepted: &BTreeSet<ExpId>,
    ) {
        let Some(reporter) = &self.reporter else {
            return;
        };

        let mut deployed = Vec::new();
        let mut pending = Vec::new();
        for (idx, experiment) in experiments.iter().enumerate() {
            let id = ExpId(idx);
            if undeployed.contains(&id) && !accepted.contains(&id) {
                pending.push(experiment.name.clone());
            } else {
                deployed.push(experiment.name.clone());
            }
        }

        reporter.write(Stage::Experiments.name(), round, deployed, pending);
    }
}

fn opt_slice(experiment: &Option<Experiment>) -> &[Experiment] {
    experiment
        .as_ref()
        .map(std::slice::from_ref)
        .unwrap_or_default()
}

async fn sleep_secs(secs: f64) {
    if secs > 0.0 {
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }
}
