//! Per-project update detection
//!
//! For every declared dependency: resolve the current version from the
//! project manifest, obtain the latest published version through the cache
//! (fetch-on-miss, honoring the per-package velocity TTL), and classify the
//! delta. A failure for one package never aborts detection for the rest of
//! the project.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::config::{ProjectConfig, Velocity};
use crate::detect::health::{HealthProbe, ServiceHealth};
use crate::detect::manifest::{Manifest, ManifestError};
use crate::version::cache::Cache;
use crate::version::error::RegistryError;
use crate::version::registry::VersionSource;
use crate::version::semver::{ChangeType, classify, recommendation};
use crate::version::types::VersionRecord;

/// One available update, derived per detection cycle and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecord {
    pub package: String,
    pub current: String,
    pub latest: String,
    pub change_type: ChangeType,
    pub has_breaking_changes: bool,
    pub recommendation: &'static str,
    /// Strategy identifier from the dependency spec; resolved at routing time
    pub strategy: String,
    pub critical: bool,
    /// Owning project name
    pub project: String,
}

/// Detection output for one project.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub project: String,
    pub timestamp: DateTime<Utc>,
    pub updates: Vec<UpdateRecord>,
    pub service_health: Vec<ServiceHealth>,
}

pub struct UpdateDetector {
    cache: Arc<Cache>,
    registry: Arc<dyn VersionSource>,
    probe: HealthProbe,
}

impl UpdateDetector {
    pub fn new(cache: Arc<Cache>, registry: Arc<dyn VersionSource>) -> Self {
        Self {
            cache,
            registry,
            probe: HealthProbe::new(),
        }
    }

    /// Latest version record for a package, from cache when fresh.
    ///
    /// Cache read errors degrade to a miss; the registry stays the source
    /// of truth. Successful fetches are written back (put failures are
    /// logged, the record is still returned).
    async fn latest_record(
        &self,
        package: &str,
        velocity: Velocity,
    ) -> Result<VersionRecord, RegistryError> {
        let ttl_ms = velocity.ttl_ms();

        let fresh = self
            .cache
            .is_valid(package, ttl_ms)
            .inspect_err(|e| warn!("Cache validity check failed for {}: {}", package, e))
            .unwrap_or(false);

        if fresh {
            match self.cache.get(package) {
                Ok(Some(record)) => {
                    debug!("Cache hit for {}", package);
                    return Ok(record);
                }
                Ok(None) => {}
                Err(e) => warn!("Cache read failed for {}: {}", package, e),
            }
        }

        let record = self.registry.fetch_latest(package).await?;

        if let Err(e) = self.cache.put(&record) {
            warn!("Failed to cache record for {}: {}", package, e);
        }

        Ok(record)
    }

    /// Check all declared dependencies and external services of a project.
    ///
    /// Only a manifest that cannot be read at all fails the whole project;
    /// individual package errors are logged and skipped.
    pub async fn check_project(
        &self,
        project: &ProjectConfig,
    ) -> Result<DetectionReport, ManifestError> {
        let manifest = Manifest::load(&project.path)?;

        let mut updates = Vec::new();

        for dep in &project.dependencies {
            let Some(current) = manifest.declared_version(&dep.package) else {
                warn!(
                    "{} not declared in {}'s manifest, skipping",
                    dep.package, project.name
                );
                continue;
            };

            let record = match self.latest_record(&dep.package, dep.velocity).await {
                Ok(record) => record,
                Err(e) => {
                    error!("Error checking {}: {}", dep.package, e);
                    continue;
                }
            };

            let change_type = classify(&current, &record.latest);
            if change_type == ChangeType::None {
                debug!("{} is up to date ({})", dep.package, current);
                continue;
            }

            // Breaking-change detection is an approximation: a major bump,
            // or the registry's own "breaking" keyword.
            let has_breaking_changes = change_type == ChangeType::Major || record.breaking;

            updates.push(UpdateRecord {
                package: dep.package.clone(),
                current,
                latest: record.latest,
                change_type,
                has_breaking_changes,
                recommendation: recommendation(change_type),
                strategy: dep.update_strategy.clone(),
                critical: dep.critical,
                project: project.name.clone(),
            });
        }

        let probes = project.external_services.iter().map(|s| self.probe.probe(s));
        let service_health = join_all(probes).await;

        Ok(DetectionReport {
            project: project.name.clone(),
            timestamp: Utc::now(),
            updates,
            service_health,
        })
    }
}
