//! Registry trait for fetching the latest published version of a package

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;
use crate::version::types::VersionRecord;

/// Trait for fetching the latest version record for a package
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait VersionSource: Send + Sync {
    /// Fetches the latest published version for a package
    ///
    /// # Arguments
    /// * `package_name` - The name of the package (e.g., "react", "@types/node")
    ///
    /// # Returns
    /// * `Ok(VersionRecord)` - Latest version plus registry metadata
    /// * `Err(RegistryError)` - Transport failure, non-2xx status, or malformed JSON
    async fn fetch_latest(&self, package_name: &str) -> Result<VersionRecord, RegistryError>;
}
