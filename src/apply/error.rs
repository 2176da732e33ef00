use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to spawn process: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Infrastructure failures of an apply attempt, distinct from step
/// failures (which roll back and report an [`super::applier::ApplyResult`]).
#[derive(Debug, Error)]
pub enum ApplyError {
    /// Backup creation failed; nothing was mutated, nothing to roll back
    #[error("Backup failed: {0}")]
    Backup(std::io::Error),

    /// Restoring from backup failed; the working tree may be dirty
    #[error("Restore from backup failed: {0}")]
    Restore(std::io::Error),
}

/// Which gating step rejected the update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    InstallFailed,
    ValidationFailed,
    TestsFailed,
    CommitFailed,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InstallFailed => "install-failed",
            FailureReason::ValidationFailed => "validation-failed",
            FailureReason::TestsFailed => "tests-failed",
            FailureReason::CommitFailed => "commit-failed",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
