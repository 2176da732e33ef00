//! npm registry API implementation

use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

use crate::version::error::RegistryError;
use crate::version::registry::VersionSource;
use crate::version::types::VersionRecord;

/// Default base URL for npm registry
const DEFAULT_BASE_URL: &str = "https://registry.npmjs.org";

/// Response from npm registry API
#[derive(Debug, Deserialize)]
struct NpmPackageResponse {
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    time: HashMap<String, String>,
    #[serde(default)]
    keywords: Vec<String>,
}

/// Registry implementation for npm registry API
pub struct NpmRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl NpmRegistry {
    /// Creates a new NpmRegistry with a custom base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("depsync")
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.to_string(),
        }
    }

    /// Encode package name for URL (handles scoped packages)
    fn encode_package_name(package_name: &str) -> String {
        if package_name.starts_with('@') {
            // Scoped package: @scope/name -> @scope%2Fname
            package_name.replace('/', "%2F")
        } else {
            package_name.to_string()
        }
    }
}

impl Default for NpmRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait::async_trait]
impl VersionSource for NpmRegistry {
    async fn fetch_latest(&self, package_name: &str) -> Result<VersionRecord, RegistryError> {
        let encoded_name = Self::encode_package_name(package_name);
        let url = format!("{}/{}", self.base_url, encoded_name);

        let response = self.client.get(&url).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(package_name.to_string()));
        }

        if !status.is_success() {
            warn!("npm registry returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let package_info: NpmPackageResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse npm registry response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        let latest = package_info.dist_tags.get("latest").ok_or_else(|| {
            RegistryError::InvalidResponse(format!(
                "No latest dist-tag for {}",
                package_name
            ))
        })?;

        Ok(VersionRecord {
            package: package_name.to_string(),
            latest: latest.clone(),
            published: package_info.time.get("modified").cloned(),
            breaking: package_info.keywords.iter().any(|k| k == "breaking"),
        })
    }
}
