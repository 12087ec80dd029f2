//! Error taxonomy shared across the workspace.

use thiserror::Error;

/// Errors produced while interpreting a spec or comparing metrics.
///
/// Every variant except [`Error::Comparison`] indicates a bad spec; none of
/// them are subject to the retry/continue/abort classification that governs
/// remote command failures.
#[derive(Debug, Error)]
pub enum Error {
    /// A requirement expression had no recognizable comparison operator.
    #[error("could not parse the requirement expression: {0:?}")]
    BadExpression(String),

    /// A scheme-prefixed string used a scheme outside the identifiable set.
    #[error("unknown scheme {scheme:?} in {input:?}")]
    UnknownScheme {
        /// The offending scheme token.
        scheme: String,
        /// The full input string.
        input: String,
    },

    /// An experiment referenced a requirement ID the spec never defines.
    #[error("requirement ID does not exist: {0}")]
    UnknownRequirement(String),

    /// A metric and a requirement value could not be compared.
    #[error("could not compare the values: {metric:?} {op} {value:?}")]
    Comparison {
        /// The measured metric.
        metric: String,
        /// The comparison operator.
        op: &'static str,
        /// The requirement value.
        value: String,
    },

    /// A retry-classified operation exceeded the configured attempt budget.
    #[error("retry budget exhausted after {attempts} attempts")]
    RetryExhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
    },
}
