//! The command executor seam and its shell implementation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::Context;
use async_trait::async_trait;
use noodles_core::CommandResult;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::endpoint::Endpoint;

/// Optional user-visible targets for the inner stdout/stderr streams.
///
/// When a target is set the stream goes to that file (truncated on the
/// first batch of a dispatch, appended afterwards) and the executor reads
/// back only the newly written tail.
#[derive(Debug, Clone, Default)]
pub struct StreamSinks {
    /// User file for inner stdout.
    pub stdout: Option<PathBuf>,
    /// User file for inner stderr.
    pub stderr: Option<PathBuf>,
    /// Append instead of truncating. Set for every batch after the first.
    pub append: bool,
}

impl StreamSinks {
    /// Sinks that capture to throwaway temp files only.
    pub fn none() -> StreamSinks {
        StreamSinks::default()
    }
}

/// Executes a rendered script against an endpoint.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `script` line-by-line through a shell on `endpoint` and capture
    /// both the launch (outer) and user-command (inner) streams.
    async fn execute(
        &self,
        endpoint: &Endpoint,
        script: &str,
        envs: &BTreeMap<String, String>,
        sinks: &StreamSinks,
    ) -> Result<CommandResult, anyhow::Error>;
}

/// Production executor backed by `bash` and `ssh`.
///
/// The script is written to a temp stdin file and fed to `bash -s` on the
/// endpoint; inner stdout/stderr are redirected to files so they stay
/// separate from the launch process's own streams:
///
/// ```text
/// bash -c "ssh -i key -p 22 user@host 'bash -s' < '/tmp/x.stdin' > '/tmp/x.stdout' 2> '/tmp/x.stderr'"
/// ```
pub struct ShellExecutor;

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(
        &self,
        endpoint: &Endpoint,
        script: &str,
        envs: &BTreeMap<String, String>,
        sinks: &StreamSinks,
    ) -> Result<CommandResult, anyhow::Error> {
        // Temp files live until the end of this call.
        let stdin_file = create_temp_file("stdin")?;
        let stdout_file = create_temp_file("stdout")?;
        let stderr_file = create_temp_file("stderr")?;

        tokio::fs::write(stdin_file.path(), script)
            .await
            .context("failed to write the script to the temp stdin file")?;

        let (stdout_path, stdout_offset) =
            resolve_sink(sinks.stdout.as_ref(), &stdout_file, sinks.append).await?;
        let (stderr_path, stderr_offset) =
            resolve_sink(sinks.stderr.as_ref(), &stderr_file, sinks.append).await?;

        let redirect = if sinks.append { ">>" } else { ">" };
        let stdout_redirect = if sinks.stdout.is_some() { redirect } else { ">" };
        let stderr_redirect = if sinks.stderr.is_some() { redirect } else { ">" };

        let outer_command = format!(
            "{} 'bash -s' < '{}' {} '{}' 2{} '{}'",
            endpoint.launch_command(),
            stdin_file.path().display(),
            stdout_redirect,
            stdout_path.display(),
            stderr_redirect,
            stderr_path.display(),
        );

        debug!(command = %outer_command, "Run outer command");

        let output = tokio::process::Command::new("bash")
            .arg("-c")
            .arg(&outer_command)
            .envs(envs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("could not run the command: {}", outer_command))?;

        let inner_stdout = read_from_offset(&stdout_path, stdout_offset).await?;
        let inner_stderr = read_from_offset(&stderr_path, stderr_offset).await?;

        Ok(CommandResult {
            outer_stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            outer_stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            inner_stdout,
            inner_stderr,
            exit_code: output.status.code().unwrap_or(-1) as i64,
        })
    }
}

fn create_temp_file(stream: &str) -> Result<NamedTempFile, anyhow::Error> {
    tempfile::Builder::new()
        .prefix("noodles.")
        .suffix(&format!(".{}", stream))
        .tempfile()
        .with_context(|| format!("failed to create the temp {} file", stream))
}

/// Pick the capture path for a stream and the offset new content starts at.
async fn resolve_sink(
    user_path: Option<&PathBuf>,
    temp_file: &NamedTempFile,
    append: bool,
) -> Result<(PathBuf, u64), anyhow::Error> {
    match user_path {
        Some(path) => {
            let offset = if append {
                tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
            } else {
                0
            };
            Ok((path.clone(), offset))
        }
        None => Ok((temp_file.path().to_path_buf(), 0)),
    }
}

async fn read_from_offset(path: &PathBuf, offset: u64) -> Result<String, anyhow::Error> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read the captured stream file {}", path.display()))?;
    let tail = bytes.get(offset as usize..).unwrap_or(&[]);
    Ok(String::from_utf8_lossy(tail).to_string())
}
