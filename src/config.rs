use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

// =============================================================================
// Policy constants
// =============================================================================

/// Timeout for external-service health probes in milliseconds (5 seconds)
pub const HEALTH_CHECK_TIMEOUT_MS: u64 = 5_000;

/// Fraction of the expected test count that must pass for an update to be
/// accepted. Tolerates minor count drift from flaky or skipped tests.
pub const TEST_PASS_RATIO: f64 = 0.95;

/// Number of backups retained per project
pub const MAX_BACKUPS: usize = 10;

/// Directory inside each project where backups accumulate
pub const BACKUP_DIR_NAME: &str = ".depsync-backups";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Project not found: {0}")]
    UnknownProject(String),
}

/// Top-level configuration: the full set of monitored projects plus the
/// strategy catalog and notification channels.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    pub projects: Vec<ProjectConfig>,
    /// Strategy catalog. Defaults to the built-in auto-patch / auto-minor /
    /// manual-major entries; config may add or override entries.
    pub strategies: HashMap<String, StrategyPolicy>,
    pub notifications: NotificationConfig,
    /// Override for the cache database location
    pub cache_db: Option<PathBuf>,
}

impl SyncConfig {
    /// Load configuration from a JSON file. Unreadable or unparseable
    /// configuration is fatal to the run.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: SyncConfig = serde_json::from_str(&raw)?;

        // Built-in strategies sit underneath any configured overrides
        for (name, policy) in builtin_strategies() {
            config.strategies.entry(name).or_insert(policy);
        }

        for project in &mut config.projects {
            project.path = expand_home(&project.path);
        }

        Ok(config)
    }

    pub fn project(&self, name: &str) -> Result<&ProjectConfig, ConfigError> {
        self.projects
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::UnknownProject(name.to_string()))
    }

    /// Path to the cache database, either configured or under the data dir.
    pub fn cache_db_path(&self) -> PathBuf {
        self.cache_db.clone().unwrap_or_else(db_path)
    }
}

/// One monitored project. Immutable once loaded.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    pub name: String,
    pub path: PathBuf,
    pub test_command: String,
    /// Expected number of passing tests for this project
    pub test_threshold: u64,
    #[serde(default)]
    pub critical: bool,
    pub dependencies: Vec<DependencySpec>,
    #[serde(default)]
    pub external_services: Vec<ExternalService>,
}

/// One monitored dependency within a project.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DependencySpec {
    pub package: String,
    /// Strategy identifier resolved against the strategy catalog at routing
    /// time. Unknown identifiers are skipped with a warning, not rejected
    /// at load time.
    pub update_strategy: String,
    #[serde(default)]
    pub critical: bool,
    /// Release-velocity classification governing the cache TTL
    #[serde(default)]
    pub velocity: Velocity,
}

/// External service a project depends on at runtime.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalService {
    pub name: String,
    #[serde(default)]
    pub healthcheck: Option<String>,
}

/// How often a package tends to publish, mapped to a cache TTL.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Velocity {
    /// Security sensitive, checked daily
    Critical,
    /// Frequently updated
    Fast,
    /// Rarely updates
    #[default]
    Stable,
    /// Only bugfixes
    Maintenance,
}

impl Velocity {
    /// Cache TTL in milliseconds: 24h / 48h / 72h / 7d.
    pub fn ttl_ms(&self) -> i64 {
        const HOUR_MS: i64 = 60 * 60 * 1000;
        match self {
            Velocity::Critical => 24 * HOUR_MS,
            Velocity::Fast => 48 * HOUR_MS,
            Velocity::Stable => 72 * HOUR_MS,
            Velocity::Maintenance => 7 * 24 * HOUR_MS,
        }
    }
}

/// Routing policy attached to a strategy identifier.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct StrategyPolicy {
    pub description: String,
    pub requires_review: bool,
    pub run_tests: bool,
    pub auto_merge: bool,
}

impl Default for StrategyPolicy {
    fn default() -> Self {
        Self {
            description: String::new(),
            requires_review: false,
            run_tests: true,
            auto_merge: false,
        }
    }
}

/// The built-in strategy catalog.
pub fn builtin_strategies() -> HashMap<String, StrategyPolicy> {
    HashMap::from([
        (
            "auto-patch".to_string(),
            StrategyPolicy {
                description: "Automatically update PATCH versions (e.g., 1.2.3 -> 1.2.4)".to_string(),
                requires_review: false,
                run_tests: true,
                auto_merge: true,
            },
        ),
        (
            "auto-minor".to_string(),
            StrategyPolicy {
                description: "Automatically update MINOR versions (e.g., 1.2.3 -> 1.3.0)".to_string(),
                requires_review: false,
                run_tests: true,
                auto_merge: true,
            },
        ),
        (
            "manual-major".to_string(),
            StrategyPolicy {
                description: "Manual review required for MAJOR versions (e.g., 1.0.0 -> 2.0.0)".to_string(),
                requires_review: true,
                run_tests: true,
                auto_merge: false,
            },
        ),
    ])
}

/// Notification channel configuration. Enablement is explicit per channel,
/// never inferred from ambient process state.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationConfig {
    pub webhook: WebhookConfig,
    pub log: LogSinkConfig,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook: WebhookConfig::default(),
            log: LogSinkConfig { enabled: true },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WebhookConfig {
    pub enabled: bool,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LogSinkConfig {
    pub enabled: bool,
}

impl Default for LogSinkConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Returns the path to the data directory for depsync.
/// Uses $XDG_DATA_HOME/depsync if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/depsync,
/// or ./depsync if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the cache database file.
pub fn db_path() -> PathBuf {
    data_dir().join("versions.db")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("depsync")
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(stripped) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(stripped),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_config(value: serde_json::Value) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("depsync.json");
        std::fs::write(&path, value.to_string()).unwrap();
        (dir, path)
    }

    #[test]
    fn load_parses_projects_and_merges_builtin_strategies() {
        let (_dir, path) = write_config(json!({
            "projects": [{
                "name": "calm-couples",
                "path": "/srv/calm-couples",
                "testCommand": "npm test",
                "testThreshold": 63,
                "critical": true,
                "dependencies": [
                    { "package": "react", "updateStrategy": "manual-major", "critical": true },
                    { "package": "framer-motion", "updateStrategy": "auto-patch", "velocity": "fast" }
                ],
                "externalServices": [
                    { "name": "Stripe", "healthcheck": "https://status.stripe.com" },
                    { "name": "Slack" }
                ]
            }]
        }));

        let config = SyncConfig::load(&path).unwrap();

        assert_eq!(config.projects.len(), 1);
        let project = config.project("calm-couples").unwrap();
        assert_eq!(project.test_threshold, 63);
        assert!(project.critical);
        assert_eq!(project.dependencies[0].velocity, Velocity::Stable);
        assert_eq!(project.dependencies[1].velocity, Velocity::Fast);
        assert_eq!(project.external_services[1].healthcheck, None);

        // Built-ins present even when config defines none
        assert!(config.strategies["auto-patch"].auto_merge);
        assert!(config.strategies["manual-major"].requires_review);
        assert!(!config.strategies["auto-minor"].requires_review);
    }

    #[test]
    fn load_lets_config_override_builtin_strategy() {
        let (_dir, path) = write_config(json!({
            "projects": [],
            "strategies": {
                "auto-patch": { "requiresReview": true, "autoMerge": false }
            }
        }));

        let config = SyncConfig::load(&path).unwrap();

        assert!(config.strategies["auto-patch"].requires_review);
        // Untouched built-ins remain
        assert!(config.strategies["manual-major"].requires_review);
    }

    #[test]
    fn load_rejects_malformed_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("depsync.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            SyncConfig::load(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn project_lookup_fails_for_unknown_name() {
        let config = SyncConfig::default();
        assert!(matches!(
            config.project("nope"),
            Err(ConfigError::UnknownProject(_))
        ));
    }

    #[test]
    fn velocity_ttls_follow_classification() {
        assert_eq!(Velocity::Critical.ttl_ms(), 24 * 60 * 60 * 1000);
        assert_eq!(Velocity::Fast.ttl_ms(), 48 * 60 * 60 * 1000);
        assert_eq!(Velocity::Stable.ttl_ms(), 72 * 60 * 60 * 1000);
        assert_eq!(Velocity::Maintenance.ttl_ms(), 7 * 24 * 60 * 60 * 1000);
    }

    #[test]
    fn data_dir_with_env_uses_xdg_data_home_when_set() {
        let path = data_dir_with_env(
            Some("/tmp/test-data".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-data/depsync"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_home_local_share() {
        let path = data_dir_with_env(None, Some(PathBuf::from("/home/user")));

        assert_eq!(path, PathBuf::from("/home/user/.local/share/depsync"));
    }

    #[test]
    fn data_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = data_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("./depsync"));
    }
}
