//! Project manifest reading for declared dependency versions

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::version::semver::normalize_constraint;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize, Default)]
struct PackageJson {
    #[serde(default)]
    dependencies: HashMap<String, String>,
    #[serde(rename = "devDependencies", default)]
    dev_dependencies: HashMap<String, String>,
}

/// The dependency declarations of one project, read once per detection run.
#[derive(Debug)]
pub struct Manifest {
    package_json: PackageJson,
}

impl Manifest {
    /// Load `package.json` from the project root.
    pub fn load(project_root: &Path) -> Result<Self, ManifestError> {
        let raw = std::fs::read_to_string(project_root.join("package.json"))?;
        let package_json = serde_json::from_str(&raw)?;
        Ok(Self { package_json })
    }

    /// Declared version for a package, constraint prefix stripped.
    ///
    /// Checks `dependencies` first, then `devDependencies`. Returns None
    /// when the package is not declared (a configuration mismatch the
    /// caller reports as a warning).
    pub fn declared_version(&self, package: &str) -> Option<String> {
        self.package_json
            .dependencies
            .get(package)
            .or_else(|| self.package_json.dev_dependencies.get(package))
            .map(|spec| normalize_constraint(spec).to_string())
    }
}
