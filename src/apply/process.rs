//! Process execution capability
//!
//! The apply state machine shells out for install, validation, tests, and
//! commits. Putting that behind a trait keeps the machine testable with a
//! fake runner, independent of a real package manager or git binary.

use std::path::Path;
use std::process::Stdio;

#[cfg(test)]
use mockall::automock;

use crate::apply::error::ProcessError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Capability to run a shell command in a working directory.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command: &str, cwd: &Path) -> Result<ProcessOutput, ProcessError>;
}

/// Runs commands through `sh -c`, capturing output.
///
/// No timeout wraps these invocations: a stuck install or test run blocks
/// the apply phase. Health probes are the only bounded external calls.
pub struct ShellRunner;

#[async_trait::async_trait]
impl ProcessRunner for ShellRunner {
    async fn run(&self, command: &str, cwd: &Path) -> Result<ProcessOutput, ProcessError> {
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(ProcessOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
