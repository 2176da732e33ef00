//! Shared fixtures for end-to-end tests
#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;

use serde_json::Value;
use tempfile::TempDir;

use depsync::apply::{ProcessError, ProcessOutput, ProcessRunner};
use depsync::config::{DependencySpec, ProjectConfig, Velocity};
use depsync::notify::{Notifier, NotifyEvent};

/// Build a project working tree with a package.json and lock file.
pub fn project_tree(dependencies: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    let deps: serde_json::Map<String, Value> = dependencies
        .iter()
        .map(|(name, spec)| (name.to_string(), Value::String(spec.to_string())))
        .collect();
    let manifest = serde_json::json!({ "dependencies": deps });
    std::fs::write(
        dir.path().join("package.json"),
        serde_json::to_string_pretty(&manifest).unwrap(),
    )
    .unwrap();
    std::fs::write(dir.path().join("package-lock.json"), "{}").unwrap();
    dir
}

pub fn project_config(name: &str, root: &Path, deps: Vec<DependencySpec>) -> ProjectConfig {
    ProjectConfig {
        name: name.to_string(),
        path: root.to_path_buf(),
        test_command: "npm test".to_string(),
        test_threshold: 63,
        critical: false,
        dependencies: deps,
        external_services: vec![],
    }
}

pub fn dep(package: &str, strategy: &str) -> DependencySpec {
    DependencySpec {
        package: package.to_string(),
        update_strategy: strategy.to_string(),
        critical: false,
        velocity: Velocity::Stable,
    }
}

/// npm registry response body for a package with one latest version.
pub fn npm_body(latest: &str) -> String {
    serde_json::json!({
        "dist-tags": { "latest": latest },
        "time": { "modified": "2026-02-01T12:00:00.000Z" },
        "keywords": []
    })
    .to_string()
}

/// Process runner that records every command and serves canned outputs.
///
/// Commands are matched by prefix; anything unmatched succeeds with empty
/// output. `npm test` defaults to the full expected pass count.
pub struct FakeRunner {
    pub commands: Mutex<Vec<String>>,
    responses: Vec<(String, ProcessOutput)>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            responses: vec![(
                "npm test".to_string(),
                ProcessOutput {
                    exit_code: 0,
                    stdout: "63 passing".to_string(),
                    stderr: String::new(),
                },
            )],
        }
    }

    /// Serve `output` for commands starting with `prefix` (checked before
    /// the defaults).
    pub fn with_response(mut self, prefix: &str, output: ProcessOutput) -> Self {
        self.responses.insert(0, (prefix.to_string(), output));
        self
    }

    pub fn ran(&self, prefix: &str) -> bool {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .any(|cmd| cmd.starts_with(prefix))
    }
}

#[async_trait::async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, command: &str, _cwd: &Path) -> Result<ProcessOutput, ProcessError> {
        self.commands.lock().unwrap().push(command.to_string());

        for (prefix, output) in &self.responses {
            if command.starts_with(prefix.as_str()) {
                return Ok(output.clone());
            }
        }

        Ok(ProcessOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

/// Notifier that records every event for later assertions.
pub struct RecordingNotifier {
    pub events: Mutex<Vec<(NotifyEvent, Value)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events_of(&self, event: NotifyEvent) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| *e == event)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: NotifyEvent, payload: &Value) {
        self.events.lock().unwrap().push((event, payload.clone()));
    }
}
