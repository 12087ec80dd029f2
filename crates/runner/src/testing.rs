//! Test doubles shared by the scheduler and requirement tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use noodles_core::CommandResult;
use noodles_remote::{CommandExecutor, Endpoint, StreamSinks};

type ReplyFn = Box<dyn Fn(&Endpoint, &str) -> CommandResult + Send + Sync>;

/// Executor that records every call and answers through a closure.
pub(crate) struct ScriptedExecutor {
    calls: Mutex<Vec<(Endpoint, String)>>,
    reply: ReplyFn,
}

impl ScriptedExecutor {
    pub(crate) fn new<F>(reply: F) -> ScriptedExecutor
    where
        F: Fn(&Endpoint, &str) -> CommandResult + Send + Sync + 'static,
    {
        ScriptedExecutor {
            calls: Mutex::new(Vec::new()),
            reply: Box::new(reply),
        }
    }

    /// Every dispatched script, in call order.
    pub(crate) fn scripts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, script)| script.clone())
            .collect()
    }

    /// Calls whose script contains `needle`, in call order.
    pub(crate) fn calls_containing(&self, needle: &str) -> Vec<(Endpoint, String)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, script)| script.contains(needle))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        endpoint: &Endpoint,
        script: &str,
        _envs: &BTreeMap<String, String>,
        _sinks: &StreamSinks,
    ) -> Result<CommandResult, anyhow::Error> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.clone(), script.to_string()));
        Ok((self.reply)(endpoint, script))
    }
}

/// The remote authority of an endpoint, or `"local"`.
pub(crate) fn authority_of(endpoint: &Endpoint) -> String {
    match endpoint {
        Endpoint::Local => "local".to_string(),
        Endpoint::Remote { authority, .. } => authority.clone(),
    }
}

/// A clean result carrying only inner stdout.
pub(crate) fn clean(stdout: &str) -> CommandResult {
    CommandResult {
        inner_stdout: stdout.to_string(),
        ..Default::default()
    }
}

/// A failing result with an exit code and inner stderr.
pub(crate) fn failing(exit_code: i64, stderr: &str) -> CommandResult {
    CommandResult {
        exit_code,
        inner_stderr: stderr.to_string(),
        ..Default::default()
    }
}
