//! Stage-scoped cache of probed metrics.

use std::collections::HashMap;

use noodles_core::Metric;

/// Metrics measured during one stage, keyed by requirement ID.
///
/// Each entry holds one slot per server, in server order. A `None` slot
/// means the server was skipped when the requirement was last probed
/// (already holding a deployment, or the probe was classified `continue`)
/// and cannot satisfy the requirement at this lookup.
///
/// Dynamic requirements overwrite their entry on every lookup. A static
/// measurement, once taken, lives for the whole stage; static `None`
/// slots are filled on a later lookup when their server is free again.
#[derive(Debug, Default)]
pub struct MetricCache {
    metrics: HashMap<String, Vec<Option<Metric>>>,
}

impl MetricCache {
    /// Create an empty cache.
    pub fn new() -> MetricCache {
        MetricCache::default()
    }

    /// Whether the requirement has a cached measurement.
    pub fn contains(&self, id: &str) -> bool {
        self.metrics.contains_key(id)
    }

    /// Store per-server metrics for a requirement, replacing any entry.
    pub fn insert(&mut self, id: &str, metrics: Vec<Option<Metric>>) {
        self.metrics.insert(id.to_string(), metrics);
    }

    /// Look up the per-server metrics for a requirement.
    pub fn get(&self, id: &str) -> Option<&[Option<Metric>]> {
        self.metrics.get(id).map(Vec::as_slice)
    }
}
