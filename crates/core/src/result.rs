//! Captured command results.

use serde::{Deserialize, Serialize};

/// Captured streams and exit status of one dispatched command batch.
///
/// The outer streams belong to the shell or SSH launch itself; the inner
/// streams belong to the user's commands. Error classification must inspect
/// both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Stdout of the launching process.
    pub outer_stdout: String,
    /// Stderr of the launching process.
    pub outer_stderr: String,
    /// Stdout produced by the user's commands.
    pub inner_stdout: String,
    /// Stderr produced by the user's commands.
    pub inner_stderr: String,
    /// Exit status of the launch.
    pub exit_code: i64,
}

impl CommandResult {
    /// Whether the batch ran cleanly: zero exit status and both stderr
    /// channels empty.
    pub fn is_clean(&self) -> bool {
        self.exit_code == 0 && self.outer_stderr.is_empty() && self.inner_stderr.is_empty()
    }
}
