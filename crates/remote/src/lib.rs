//! Command execution against local and SSH endpoints.
//!
//! The [`CommandExecutor`] trait is the seam between the scheduling core and
//! the operating system: it takes a rendered shell script, an endpoint and
//! environment variables, and returns the captured [`CommandResult`]. The
//! [`Dispatcher`] sits on top, turning scheme-tagged command lists into
//! per-endpoint batches and classifying failures against the configured
//! error handlers.

mod classify;
mod dispatcher;
mod endpoint;
mod executor;

pub use classify::{classify, failure_report};
pub use dispatcher::Dispatcher;
pub use endpoint::Endpoint;
pub use executor::{CommandExecutor, ShellExecutor, StreamSinks};

pub use noodles_core::CommandResult;
