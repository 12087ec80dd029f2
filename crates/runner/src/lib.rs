//! The scheduling and placement core.
//!
//! A run walks three stages (`before_all_experiments`, `experiments`,
//! `after_all_experiments`). Within a stage the [`Scheduler`] loops
//! placement rounds over the undeployed experiments, asking the
//! [`RequirementEngine`] which servers satisfy each experiment's
//! requirement groups and dispatching the experiment's commands to the
//! first satisfied server. Command failures are classified into
//! `success`/`continue`/`retry`/`abort` and drive what the next round sees.

mod cache;
mod requirement;
mod retry;
mod scheduler;
mod status;

pub use cache::MetricCache;
pub use requirement::RequirementEngine;
pub use retry::RetryBudget;
pub use scheduler::{RunSummary, Scheduler, Stage};
pub use status::{StatusReporter, StatusSnapshot};

#[cfg(test)]
pub(crate) mod testing;
