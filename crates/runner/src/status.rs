//! Best-effort status snapshots written during the main stage.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::warn;

/// One point-in-time view of main-stage progress, serialized as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    /// When the run started, RFC 3339.
    pub start_time: String,
    /// When this snapshot was taken, RFC 3339.
    pub last_round_time: String,
    /// Seconds elapsed since the run started.
    pub elapsed_secs: f64,
    /// Stage the snapshot belongs to.
    pub stage: String,
    /// One-based round number within the stage.
    pub round: usize,
    /// Names of the experiments deployed so far.
    pub deployed: Vec<String>,
    /// Names of the experiments still waiting.
    pub undeployed: Vec<String>,
}

/// Writes progress snapshots to a file.
///
/// Writes are best-effort: a broken status path is logged and never takes
/// the run down.
#[derive(Debug)]
pub struct StatusReporter {
    path: PathBuf,
    start_time: DateTime<Utc>,
    start: Instant,
}

impl StatusReporter {
    /// Create a reporter targeting the given file.
    pub fn new(path: PathBuf) -> StatusReporter {
        StatusReporter {
            path,
            start_time: Utc::now(),
            start: Instant::now(),
        }
    }

    /// Overwrite the status file with a fresh snapshot.
    pub fn write(&self, stage: &str, round: usize, deployed: Vec<String>, undeployed: Vec<String>) {
        let snapshot = StatusSnapshot {
            start_time: self.start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            last_round_time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            elapsed_secs: self.start.elapsed().as_secs_f64(),
            stage: stage.to_string(),
            round,
            deployed,
            undeployed,
        };

        if let Err(err) = self.try_write(&snapshot) {
            warn!(path = %self.path.display(), %err, "Could not write the status file");
        }
    }

    fn try_write(&self, snapshot: &StatusSnapshot) -> Result<(), anyhow::Error> {
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_produces_readable_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");
        let reporter = StatusReporter::new(path.clone());

        reporter.write(
            "experiments",
            2,
            vec!["exp1".to_string()],
            vec!["exp2".to_string()],
        );

        let raw = std::fs::read_to_string(&path).unwrap();
        let snapshot: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(snapshot["stage"], "experiments");
        assert_eq!(snapshot["round"], 2);
        assert_eq!(snapshot["deployed"][0], "exp1");
        assert_eq!(snapshot["undeployed"][0], "exp2");
        assert!(snapshot["elapsed_secs"].as_f64().unwrap() >= 0.0);
    }

    #[test]
    fn test_unwritable_path_is_swallowed() {
        let reporter = StatusReporter::new(PathBuf::from("/nonexistent/dir/status.json"));
        reporter.write("experiments", 1, Vec::new(), Vec::new());
    }
}
