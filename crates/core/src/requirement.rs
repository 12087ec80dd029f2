//! Requirement identifiers and their refresh policy.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::scheme::{split_scheme, SchemeSplit};

/// How often a requirement's metric is re-measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Refresh {
    /// Measure once and reuse the cached value (e.g. hardware capability).
    Static,
    /// Re-measure on every lookup (e.g. load). This is the default.
    Dynamic,
}

/// A requirement reference inside an experiment's requirement group.
///
/// The spec form is `[static:|dynamic:]<id>`; the scheme is resolved here,
/// once, at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementKey {
    /// Requirement ID, without any scheme prefix.
    pub id: String,
    /// Refresh policy.
    pub refresh: Refresh,
}

impl RequirementKey {
    /// Parse a requirement reference, resolving its optional scheme prefix.
    pub fn parse(raw: &str) -> Result<RequirementKey, Error> {
        match split_scheme(raw, &["static", "dynamic"]) {
            SchemeSplit::Known("static", id) => Ok(RequirementKey {
                id: id.to_string(),
                refresh: Refresh::Static,
            }),
            SchemeSplit::Known(_, id) => Ok(RequirementKey {
                id: id.to_string(),
                refresh: Refresh::Dynamic,
            }),
            SchemeSplit::Bare(id) => Ok(RequirementKey {
                id: id.to_string(),
                refresh: Refresh::Dynamic,
            }),
            SchemeSplit::Unknown(scheme) => Err(Error::UnknownScheme {
                scheme: scheme.to_string(),
                input: raw.to_string(),
            }),
        }
    }
}
