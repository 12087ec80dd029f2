//! Error classification against the configured handler rules.

use anyhow::Context;
use noodles_core::{Action, CommandResult, ErrorHandler, ReturnCodeMatcher, RunOptions};
use regex::Regex;
use tracing::debug;

/// Classify a command result.
///
/// A clean result (zero exit status, both stderr channels empty) is
/// `Success`, as is any result when `check_any_errors` is off. Otherwise the
/// ordered error handlers are consulted: the first rule whose return-code
/// matcher and stderr pattern both hold decides; when none match the action
/// is `Abort`.
pub fn classify(result: &CommandResult, options: &RunOptions) -> Result<Action, anyhow::Error> {
    if !options.check_any_errors || result.is_clean() {
        return Ok(Action::Success);
    }

    for handler in &options.error_handlers {
        if handler_matches(handler, result)? {
            debug!(
                name = %handler.name,
                action = ?handler.action,
                "Found error handler match"
            );
            return Ok(handler.action);
        }
    }

    Ok(Action::Abort)
}

fn handler_matches(handler: &ErrorHandler, result: &CommandResult) -> Result<bool, anyhow::Error> {
    let code_matches = match &handler.return_code {
        None => true,
        Some(ReturnCodeMatcher::Literal(code)) => result.exit_code == *code,
        Some(ReturnCodeMatcher::Pattern(pattern)) => {
            full_match(pattern, &result.exit_code.to_string())?
        }
    };
    if !code_matches {
        return Ok(false);
    }

    match &handler.stderr_pattern {
        None => Ok(true),
        Some(pattern) => full_match(pattern, &result.inner_stderr),
    }
}

fn full_match(pattern: &str, text: &str) -> Result<bool, anyhow::Error> {
    let anchored = format!("^(?:{})$", pattern);
    let regex = Regex::new(&anchored)
        .with_context(|| format!("invalid error handler pattern: {}", pattern))?;
    Ok(regex.is_match(text))
}

/// Render the full context of a failed command batch for logs and fatal
/// errors.
pub fn failure_report(result: &CommandResult, script: &str) -> String {
    [
        "Error occurred when running the commands".to_string(),
        format!("Commands->\n{}", script),
        format!("Return code: {}", result.exit_code),
        format!("Outer STDOUT->\n{}", result.outer_stdout),
        format!("Outer STDERR->\n{}", result.outer_stderr),
        format!("Inner STDOUT->\n{}", result.inner_stdout),
        format!("Inner STDERR->\n{}", result.inner_stderr),
    ]
    .join("\n")
}
