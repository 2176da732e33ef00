//! Guarded update application layer
//!
//! # Modules
//!
//! - [`applier`]: The backup → install → validate → test → commit machine
//! - [`backup`]: Manifest backup create/restore/prune
//! - [`process`]: `ProcessRunner` capability and the real shell runner
//! - [`error`]: Apply and process error types

pub mod applier;
pub mod backup;
pub mod error;
pub mod process;

pub use applier::{ApplyResult, ApplyState, UpdateApplier};
pub use error::{ApplyError, FailureReason, ProcessError};
pub use process::{ProcessOutput, ProcessRunner, ShellRunner};
