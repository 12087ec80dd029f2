//! Run-wide options and error-handler rules.

use serde::{Deserialize, Serialize};

/// Outcome of classifying a command result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// No error; proceed normally.
    Success,
    /// Give up on this operation without failing the run.
    Continue,
    /// Re-issue the same operation.
    Retry,
    /// Fatal; terminate the run.
    Abort,
}

/// Matcher for a command's exit status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReturnCodeMatcher {
    /// Exact exit code.
    Literal(i64),
    /// Regex matched in full against the decimal rendering of the code.
    Pattern(String),
}

/// One rule in the ordered error-handler list.
///
/// A handler matches when both its return-code matcher and its stderr
/// pattern hold; a missing matcher holds for anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorHandler {
    /// Rule name for logs.
    #[serde(default)]
    pub name: String,

    /// Exit status matcher.
    #[serde(default)]
    pub return_code: Option<ReturnCodeMatcher>,

    /// Full-match regex against the command's (inner) stderr.
    #[serde(default)]
    pub stderr_pattern: Option<String>,

    /// Action taken when the rule matches.
    #[serde(default = "default_action")]
    pub action: Action,
}

fn default_action() -> Action {
    Action::Abort
}

/// Global timing and error-handling options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Seconds to wait before every round after the first.
    #[serde(default)]
    pub round_interval: f64,

    /// Seconds to wait before every placement after the first accepted one
    /// in a round.
    #[serde(default)]
    pub deployment_interval: f64,

    /// When false, command results are never treated as errors.
    #[serde(default = "default_check_any_errors")]
    pub check_any_errors: bool,

    /// Ordered error-handler rules consulted on command failure.
    #[serde(default)]
    pub error_handlers: Vec<ErrorHandler>,

    /// Attempt budget for retry-classified operations. `None` retries
    /// forever, matching the historical behavior where the operator is
    /// expected to fix the environment while the tool blocks.
    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            round_interval: 0.0,
            deployment_interval: 0.0,
            check_any_errors: true,
            error_handlers: Vec::new(),
            max_retries: None,
        }
    }
}

fn default_check_any_errors() -> bool {
    true
}
