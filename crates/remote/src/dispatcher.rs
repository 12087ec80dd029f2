//! Batching of scheme-tagged commands and classified dispatch.

use std::collections::BTreeMap;

use anyhow::bail;
use noodles_core::{Action, Command, CommandResult, CommandScheme, OutputFiles, RunOptions, Server};
use tracing::{debug, warn};

use crate::classify::{classify, failure_report};
use crate::endpoint::Endpoint;
use crate::executor::{CommandExecutor, StreamSinks};

/// Turns scheme-tagged command lists into per-endpoint batches and runs
/// them through a [`CommandExecutor`].
pub struct Dispatcher<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> Dispatcher<'a> {
    /// Create a dispatcher over an executor.
    pub fn new(executor: &'a dyn CommandExecutor) -> Dispatcher<'a> {
        Dispatcher { executor }
    }

    /// Run a command list against a server, one batch per maximal run of
    /// same-scheme commands, and return the per-batch results in order.
    ///
    /// Each batch's script starts with `export` statements for every
    /// environment variable, followed by the batch's command lines. When
    /// `outputs` names user files, the first batch truncates them and later
    /// batches append.
    pub async fn run(
        &self,
        server: Option<&Server>,
        commands: &[Command],
        envs: &BTreeMap<String, String>,
        outputs: &OutputFiles,
    ) -> Result<Vec<CommandResult>, anyhow::Error> {
        let mut results = Vec::new();

        for (batch_idx, (scheme, lines)) in batch_by_scheme(commands).into_iter().enumerate() {
            let endpoint = match scheme {
                CommandScheme::Local => Endpoint::Local,
                CommandScheme::Remote => Endpoint::for_server(server),
            };
            let script = render_script(&lines, envs);
            let sinks = StreamSinks {
                stdout: outputs.stdout.clone(),
                stderr: outputs.stderr.clone(),
                append: batch_idx > 0,
            };

            debug!(?endpoint, script = %script, "Dispatch command batch");

            let result = self.executor.execute(&endpoint, &script, envs, &sinks).await?;
            results.push(result);
        }

        Ok(results)
    }

    /// Run a command list and classify the outcome.
    ///
    /// Batches are inspected in order; the first non-success classification
    /// decides the overall action (an abort becomes a fatal error carrying
    /// the full failure report). The returned string is the concatenation
    /// of every batch's inner stdout.
    pub async fn run_classified(
        &self,
        server: Option<&Server>,
        commands: &[Command],
        envs: &BTreeMap<String, String>,
        outputs: &OutputFiles,
        options: &RunOptions,
    ) -> Result<(Action, String), anyhow::Error> {
        let results = self.run(server, commands, envs, outputs).await?;
        let script: String = commands
            .iter()
            .map(|c| c.line.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let mut action = Action::Success;
        for result in &results {
            action = classify(result, options)?;
            match action {
                Action::Success => continue,
                Action::Continue | Action::Retry => {
                    warn!(?action, "{}", failure_report(result, &script));
                    break;
                }
                Action::Abort => {
                    bail!(failure_report(result, &script));
                }
            }
        }

        let stdout: String = results.iter().map(|r| r.inner_stdout.as_str()).collect();
        Ok((action, stdout))
    }

    /// Evaluate a `$`-bearing expression in the local shell via `echo -n`.
    pub async fn evaluate_local(
        &self,
        expr: &str,
        envs: &BTreeMap<String, String>,
        options: &RunOptions,
    ) -> Result<(Action, String), anyhow::Error> {
        let command = Command {
            scheme: CommandScheme::Local,
            line: format!("echo -n {}", expr),
        };
        self.run_classified(None, &[command], envs, &OutputFiles::default(), options)
            .await
    }
}

/// Partition commands into maximal contiguous runs of the same scheme,
/// preserving their relative order.
fn batch_by_scheme(commands: &[Command]) -> Vec<(CommandScheme, Vec<&str>)> {
    let mut batches: Vec<(CommandScheme, Vec<&str>)> = Vec::new();

    for command in commands {
        match batches.last_mut() {
            Some((scheme, lines)) if *scheme == command.scheme => {
                lines.push(command.line.as_str());
            }
            _ => batches.push((command.scheme, vec![command.line.as_str()])),
        }
    }

    batches
}

/// Render a batch script: one `export` per env var, then the command lines.
fn render_script(lines: &[&str], envs: &BTreeMap<String, String>) -> String {
    let mut script: Vec<String> = envs
        .iter()
        .map(|(key, value)| format!("export {}=\"{}\"", key, escape_double_quotes(value)))
        .collect();
    script.extend(lines.iter().map(|line| line.to_string()));
    script.join("\n")
}

fn escape_double_quotes(value: &str) -> String {
    value.replace('"', "\\\"")
}
