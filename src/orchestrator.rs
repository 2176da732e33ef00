//! Sync-cycle orchestration
//!
//! Drives one full cycle: detection across all projects in parallel, then a
//! strictly sequential routing/application phase so no two installs ever
//! interleave, then a final summary notification. Per-item failures are
//! isolated; only configuration/bootstrap failures abort a run.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::apply::{ProcessRunner, UpdateApplier};
use crate::config::{ConfigError, ProjectConfig, SyncConfig};
use crate::detect::manifest::ManifestError;
use crate::detect::{DetectionReport, UpdateDetector, UpdateRecord};
use crate::notify::{Notifier, NotifyEvent};
use crate::router::{self, Route};
use crate::version::cache::Cache;
use crate::version::registry::VersionSource;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Aggregated outcome of one sync cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub total: usize,
    pub applied: usize,
    pub failed: usize,
    pub pending_review: usize,
    pub skipped: usize,
}

pub struct Orchestrator {
    config: SyncConfig,
    detector: UpdateDetector,
    runner: Arc<dyn ProcessRunner>,
    notifier: Arc<dyn Notifier>,
}

impl Orchestrator {
    pub fn new(
        config: SyncConfig,
        cache: Arc<Cache>,
        registry: Arc<dyn VersionSource>,
        runner: Arc<dyn ProcessRunner>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            detector: UpdateDetector::new(cache, registry),
            runner,
            notifier,
        }
    }

    /// Run one full sync cycle across every configured project.
    pub async fn run_full_sync(&self) -> SyncSummary {
        info!(
            "Starting dependency sync across {} projects",
            self.config.projects.len()
        );

        // Detection fans out across projects; one project failing never
        // aborts the cycle.
        let reports = join_all(self.config.projects.iter().map(|project| async move {
            match self.detector.check_project(project).await {
                Ok(report) => {
                    info!(
                        "{}: {} updates available",
                        project.name,
                        report.updates.len()
                    );
                    Some(report)
                }
                Err(e) => {
                    error!("{}: detection failed: {}", project.name, e);
                    None
                }
            }
        }))
        .await;

        let mut updates: Vec<UpdateRecord> = reports
            .into_iter()
            .flatten()
            .flat_map(|report| report.updates)
            .collect();

        if updates.is_empty() {
            info!("All projects are up to date");
            self.notifier
                .notify(
                    NotifyEvent::Summary,
                    &json!({ "total": 0, "applied": 0, "pending": 0 }),
                )
                .await;
            return SyncSummary::default();
        }

        router::order_updates(&mut updates);
        info!("Routing {} updates", updates.len());

        let mut summary = SyncSummary {
            total: updates.len(),
            ..SyncSummary::default()
        };

        // Application is strictly sequential: one install/test run at a
        // time, one working tree mutated at a time.
        for update in &updates {
            let project = match self.config.project(&update.project) {
                Ok(project) => project,
                Err(e) => {
                    warn!("Skipping {}: {}", update.package, e);
                    summary.skipped += 1;
                    continue;
                }
            };

            match router::route(update, &self.config.strategies) {
                Route::Skip => summary.skipped += 1,
                Route::ManualReview => {
                    info!(
                        "Manual review needed: {} ({} change)",
                        update.package, update.change_type
                    );
                    self.notifier
                        .notify(
                            NotifyEvent::ManualReview,
                            &json!({
                                "project": project.name,
                                "package": update.package,
                                "version": update.latest,
                                "changeType": update.change_type,
                                "recommendation": update.recommendation,
                            }),
                        )
                        .await;
                    summary.pending_review += 1;
                }
                Route::AutoApply => self.auto_apply(update, project, &mut summary).await,
            }
        }

        info!(
            "Sync complete: {} applied, {} failed, {} pending review",
            summary.applied, summary.failed, summary.pending_review
        );

        self.notifier
            .notify(
                NotifyEvent::Summary,
                &json!({
                    "total": summary.total,
                    "applied": summary.applied,
                    "failed": summary.failed,
                    "pendingReview": summary.pending_review,
                    "timestamp": Utc::now().to_rfc3339(),
                }),
            )
            .await;

        summary
    }

    async fn auto_apply(
        &self,
        update: &UpdateRecord,
        project: &ProjectConfig,
        summary: &mut SyncSummary,
    ) {
        info!("Auto-applying {} ({})", update.package, update.strategy);

        let applier = UpdateApplier::new(&project.path, self.runner.clone());
        let outcome = applier
            .apply_update(update, &project.test_command, project.test_threshold)
            .await;

        match outcome {
            Ok(result) if result.success => {
                self.notifier
                    .notify(
                        NotifyEvent::Success,
                        &json!({
                            "project": project.name,
                            "package": update.package,
                            "version": update.latest,
                            "autoApplied": true,
                        }),
                    )
                    .await;
                summary.applied += 1;
            }
            Ok(result) => {
                let reason = result
                    .reason
                    .map(|r| r.as_str())
                    .unwrap_or("unknown");
                self.notifier
                    .notify(
                        NotifyEvent::Failure,
                        &json!({
                            "project": project.name,
                            "package": update.package,
                            "reason": reason,
                            "testsPassed": result.tests_passed,
                            "testsFailed": result.tests_failed,
                        }),
                    )
                    .await;
                summary.failed += 1;
            }
            Err(e) => {
                error!("Apply aborted for {}: {}", update.package, e);
                self.notifier
                    .notify(
                        NotifyEvent::Failure,
                        &json!({
                            "project": project.name,
                            "package": update.package,
                            "reason": e.to_string(),
                        }),
                    )
                    .await;
                summary.failed += 1;
            }
        }

        applier.cleanup_backups();
    }

    /// Detection report for a single project, for the `check` command.
    pub async fn check_project(&self, name: &str) -> Result<DetectionReport, SyncError> {
        let project = self.config.project(name)?;
        Ok(self.detector.check_project(project).await?)
    }
}
