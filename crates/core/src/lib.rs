//! Noodles core data models.
//!
//! This crate defines the structured view of a deployment spec (experiments,
//! servers, requirements, run options) together with the two small pieces of
//! pure logic everything else builds on: requirement expression parsing and
//! metric evaluation/comparison. No I/O happens here.

#![warn(missing_docs)]

mod error;

// Expression and metric machinery
mod expr;
mod metric;

// Scheme-prefixed identifiers
mod command;
mod requirement;
mod scheme;

// Spec entities
mod experiment;
mod options;
mod plan;
mod result;
mod server;

// Re-exports
pub use error::Error;

pub use expr::{CompareOp, Expression};
pub use metric::Metric;

pub use command::{Command, CommandScheme};
pub use requirement::{Refresh, RequirementKey};

pub use experiment::{ExpId, Experiment, OutputFiles};
pub use options::{Action, ErrorHandler, ReturnCodeMatcher, RunOptions};
pub use plan::RunPlan;
pub use result::CommandResult;
pub use server::Server;
