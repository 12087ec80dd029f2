//! The normalized view of a spec for one invocation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::experiment::Experiment;
use crate::options::RunOptions;
use crate::server::Server;

/// Everything the scheduler needs for one command type, fully typed and
/// defaulted.
///
/// Built once by the spec provider and then treated as immutable; the
/// scheduler keeps its own bookkeeping separately.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunPlan {
    /// Global timing and error-handling options.
    pub options: RunOptions,

    /// Candidate servers, in spec order.
    pub servers: Vec<Server>,

    /// Requirement ID to the probe commands that measure it.
    pub requirements: BTreeMap<String, Vec<Command>>,

    /// Optional single experiment run before the main stage.
    pub before_all: Option<Experiment>,

    /// Main-stage experiments, in spec order.
    pub experiments: Vec<Experiment>,

    /// Optional single experiment run after the main stage.
    pub after_all: Option<Experiment>,

    /// Status snapshot output path for the active command type.
    pub status_path: Option<PathBuf>,
}
