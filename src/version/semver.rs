use semver::Version;
use serde::Serialize;

/// Severity of the delta between a declared version and the latest
/// published version.
///
/// Dominance order: major > minor > patch > none. A downgrade (latest
/// older than current) classifies as `None` in every segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    None,
    Patch,
    Minor,
    Major,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::None => "none",
            ChangeType::Patch => "patch",
            ChangeType::Minor => "minor",
            ChangeType::Major => "major",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip range constraint prefixes (`^`, `~`) and surrounding whitespace
/// from a manifest version specification.
///
/// Examples:
/// - "^18.2.0" -> "18.2.0"
/// - "~1.4.1" -> "1.4.1"
pub fn normalize_constraint(spec: &str) -> &str {
    spec.trim().trim_start_matches(['^', '~'])
}

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Handles partial versions like "1" or "1.2" by padding with zeros.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "1.2" -> Version(1, 2, 0)
/// - "1.2.3" -> Version(1, 2, 3)
pub fn parse_version(version: &str) -> Option<Version> {
    let parts: Vec<&str> = version.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Classify the change from `current` to `latest`.
///
/// Pure component-wise comparison of the three version segments: the first
/// segment where latest exceeds current wins. Equal versions, downgrades,
/// and unparseable versions all classify as `None`.
pub fn classify(current: &str, latest: &str) -> ChangeType {
    let (Some(c), Some(l)) = (parse_version(current), parse_version(latest)) else {
        return ChangeType::None;
    };

    if l.major != c.major {
        return if l.major > c.major {
            ChangeType::Major
        } else {
            ChangeType::None
        };
    }
    if l.minor != c.minor {
        return if l.minor > c.minor {
            ChangeType::Minor
        } else {
            ChangeType::None
        };
    }
    if l.patch > c.patch {
        ChangeType::Patch
    } else {
        ChangeType::None
    }
}

/// Human-readable recommendation derived purely from the change type.
pub fn recommendation(change_type: ChangeType) -> &'static str {
    match change_type {
        ChangeType::Major => "Manual review required",
        ChangeType::Minor => "Recommend testing",
        _ => "Safe to auto-update",
    }
}
