//! Experiments as resolved for one invocation command type.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::expr::Expression;
use crate::requirement::RequirementKey;

/// Stable handle for an experiment within its stage.
///
/// Assigned once at load time, so filtering the undeployed set never needs
/// a positional index remapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExpId(pub usize);

/// Output redirection targets for an experiment's command streams.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputFiles {
    /// Append-target for captured stdout.
    pub stdout: Option<PathBuf>,
    /// Append-target for captured stderr.
    pub stderr: Option<PathBuf>,
}

/// One experiment, with commands and requirements already resolved for the
/// active command type and defaults merged in.
///
/// Immutable for the duration of a run; deployment bookkeeping lives in the
/// scheduler, keyed by [`ExpId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// Experiment name, used for dependency resolution and reporting.
    pub name: String,

    /// Command lines for the active command type. Empty means the
    /// experiment is a no-op for this invocation.
    pub commands: Vec<Command>,

    /// Environment variables exported before every command batch.
    pub envs: BTreeMap<String, String>,

    /// Ordered requirement groups; groups narrow the candidate server set
    /// one after another.
    pub requirement_groups: Vec<Vec<(RequirementKey, Expression)>>,

    /// Names of experiments that must be deployed in this stage first.
    pub depends_on: Vec<String>,

    /// Optional stdout/stderr redirection targets.
    pub outputs: OutputFiles,
}

impl Experiment {
    /// Whether the experiment has nothing to run for this command type.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
