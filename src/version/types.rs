//! Common types for the version layer

use serde::{Deserialize, Serialize};

/// A registry observation for one package: the latest published version
/// plus the metadata the routing heuristics care about.
///
/// One live record exists per package at a time; cache writes are
/// whole-record replacements (last fetch wins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Package name as known to the registry
    pub package: String,
    /// Latest published version (the `latest` dist-tag)
    pub latest: String,
    /// Publish timestamp reported by the registry, if any
    pub published: Option<String>,
    /// Whether the registry metadata carries a "breaking" keyword
    pub breaking: bool,
}

impl VersionRecord {
    pub fn new(package: &str, latest: &str) -> Self {
        Self {
            package: package.to_string(),
            latest: latest.to_string(),
            published: None,
            breaking: false,
        }
    }
}
