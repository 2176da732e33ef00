//! Guarded update application
//!
//! One apply attempt is a strictly sequential state machine: backup →
//! install → validate → test → commit. Each step gates the next; any step
//! failure restores the whole tree from the step-0 backup. The tree is
//! never left in an intermediate dirty state at the end of an attempt.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::apply::backup::BackupStore;
use crate::apply::error::{ApplyError, FailureReason};
use crate::apply::process::{ProcessOutput, ProcessRunner};
use crate::config::{MAX_BACKUPS, TEST_PASS_RATIO};
use crate::detect::UpdateRecord;

static PASSING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) passing").expect("valid regex"));
static FAILING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) failing").expect("valid regex"));

/// States of one apply attempt, entered in order. Transitions are
/// single-direction; any step failure moves to `RolledBack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyState {
    BackedUp,
    Installed,
    Validated,
    Tested,
    Committed,
    RolledBack,
}

/// Outcome of one apply attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    pub success: bool,
    pub reason: Option<FailureReason>,
    pub tests_passed: Option<u64>,
    pub tests_failed: Option<u64>,
    pub backup_path: PathBuf,
}

pub struct UpdateApplier {
    project_root: PathBuf,
    runner: Arc<dyn ProcessRunner>,
    backups: BackupStore,
}

impl UpdateApplier {
    pub fn new(project_root: &Path, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            runner,
            backups: BackupStore::new(project_root),
        }
    }

    /// Apply one update behind the full set of quality gates.
    ///
    /// `Err` means infrastructure trouble: the backup could not be created
    /// (nothing was mutated) or a rollback itself failed. Step failures
    /// roll back and return `Ok` with a failure result.
    pub async fn apply_update(
        &self,
        update: &UpdateRecord,
        test_command: &str,
        test_threshold: u64,
    ) -> Result<ApplyResult, ApplyError> {
        let backup = self
            .backups
            .create(&format!("{}-{}", update.package, update.latest))
            .map_err(ApplyError::Backup)?;
        let mut state = ApplyState::BackedUp;
        debug!(?state, package = %update.package, "backup created");

        info!(
            "Updating {} {} -> {} in {:?}",
            update.package, update.current, update.latest, self.project_root
        );

        // Install: pin the target version
        let install = self
            .run_step(&format!(
                "npm install {}@{} --save",
                update.package, update.latest
            ))
            .await;
        if !install.success() {
            error!("Install failed: {}", install.stderr.trim());
            return self.roll_back(backup, FailureReason::InstallFailed, None, None);
        }
        state = ApplyState::Installed;
        debug!(?state, package = %update.package, "install succeeded");

        // Validate: the installed package must load in isolation
        let validate = self
            .run_step(&format!("node -e \"require('{}')\"", update.package))
            .await;
        if !validate.success() {
            error!("Package validation failed: {}", validate.stderr.trim());
            return self.roll_back(backup, FailureReason::ValidationFailed, None, None);
        }
        state = ApplyState::Validated;
        debug!(?state, package = %update.package, "validation succeeded");

        // Test: full suite, gated on parsed pass/fail counts
        let test = self.run_step(test_command).await;
        let (passed, failed) = parse_test_counts(&test.stdout);
        if !test.success() || !tests_pass(passed, failed, test_threshold) {
            error!(
                "Tests failed: {} passed, {} failed (expected {})",
                passed, failed, test_threshold
            );
            return self.roll_back(
                backup,
                FailureReason::TestsFailed,
                Some(passed),
                Some(failed),
            );
        }
        state = ApplyState::Tested;
        info!(
            ?state,
            "Tests passed: {}/{} ({:.1}%)",
            passed,
            test_threshold,
            passed as f64 / test_threshold as f64 * 100.0
        );

        // Commit: record old -> new with a breaking-change marker
        let message = commit_message(update);
        let stage = self
            .run_step("git add package.json package-lock.json")
            .await;
        let commit = if stage.success() {
            self.run_step(&format!("git commit -m \"{}\" --no-verify", message))
                .await
        } else {
            stage
        };
        if !commit.success() {
            error!("Commit failed: {}", commit.stderr.trim());
            return self.roll_back(
                backup,
                FailureReason::CommitFailed,
                Some(passed),
                Some(failed),
            );
        }
        state = ApplyState::Committed;
        info!(?state, "Committed: {}", message);

        Ok(ApplyResult {
            success: true,
            reason: None,
            tests_passed: Some(passed),
            tests_failed: Some(failed),
            backup_path: backup,
        })
    }

    /// Prune old backups, keeping the most recent [`MAX_BACKUPS`].
    pub fn cleanup_backups(&self) {
        self.backups.prune(MAX_BACKUPS);
    }

    async fn run_step(&self, command: &str) -> ProcessOutput {
        match self.runner.run(command, &self.project_root).await {
            Ok(output) => output,
            Err(e) => {
                error!("Failed to run `{}`: {}", command, e);
                ProcessOutput {
                    exit_code: -1,
                    stdout: String::new(),
                    stderr: e.to_string(),
                }
            }
        }
    }

    /// Unconditional restore-to-start. No partial undo of the failed step.
    fn roll_back(
        &self,
        backup: PathBuf,
        reason: FailureReason,
        tests_passed: Option<u64>,
        tests_failed: Option<u64>,
    ) -> Result<ApplyResult, ApplyError> {
        self.backups.restore(&backup).map_err(ApplyError::Restore)?;
        warn!(state = ?ApplyState::RolledBack, "Rolled back after {}", reason);

        Ok(ApplyResult {
            success: false,
            reason: Some(reason),
            tests_passed,
            tests_failed,
            backup_path: backup,
        })
    }
}

fn commit_message(update: &UpdateRecord) -> String {
    format!(
        "deps: upgrade {} {} → {}{}",
        update.package,
        update.current,
        update.latest,
        if update.has_breaking_changes {
            " (breaking change)"
        } else {
            ""
        }
    )
}

/// Parse `N passing` / `N failing` counts from test runner output.
fn parse_test_counts(output: &str) -> (u64, u64) {
    let passed = PASSING_RE
        .captures(output)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0);
    let failed = FAILING_RE
        .captures(output)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0);
    (passed, failed)
}

/// No failures, and the pass count within tolerated drift of the expected
/// threshold.
fn tests_pass(passed: u64, failed: u64, threshold: u64) -> bool {
    failed == 0 && passed as f64 >= threshold as f64 * TEST_PASS_RATIO
}
