//! YAML spec loading and normalization.
//!
//! Reads a deployment spec file and resolves it, for one invocation command
//! type, into the typed [`RunPlan`](noodles_core::RunPlan) the scheduler
//! consumes: one-or-many shorthands unwrapped, `experiment_default` details
//! merged in, and every expression, requirement scheme, and command scheme
//! parsed up front so a bad spec fails before anything runs.

mod load;
mod raw;

pub use load::{load_plan, plan_from_str, SpecError};
