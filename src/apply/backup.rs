//! Manifest backups for rollback
//!
//! Each apply attempt starts by copying the manifest and lock files into a
//! uniquely timestamped directory. Rollback is unconditional restoration of
//! that directory's contents; retention keeps the most recent backups,
//! pruned lexicographically by timestamp-prefixed name.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};

use crate::config::BACKUP_DIR_NAME;

/// Files covered by a backup, when present in the project root.
const MANIFEST_FILES: &[&str] = &["package.json", "package-lock.json", "npm-shrinkwrap.json"];

pub struct BackupStore {
    project_root: PathBuf,
    backup_dir: PathBuf,
}

impl BackupStore {
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            backup_dir: project_root.join(BACKUP_DIR_NAME),
        }
    }

    /// Copy manifest and lock files into a fresh timestamped directory.
    ///
    /// Returns the backup path. Idempotent per attempt: each call creates
    /// its own directory and never touches earlier backups.
    pub fn create(&self, id: &str) -> io::Result<PathBuf> {
        let timestamp = Utc::now().to_rfc3339().replace([':', '.'], "-");
        let backup_path = self.backup_dir.join(format!("backup-{}-{}", timestamp, id));
        std::fs::create_dir_all(&backup_path)?;

        for file in MANIFEST_FILES {
            let src = self.project_root.join(file);
            if src.exists() {
                std::fs::copy(&src, backup_path.join(file))?;
            }
        }

        debug!("Created backup at {:?}", backup_path);
        Ok(backup_path)
    }

    /// Restore every file in the backup into the project root, verbatim.
    pub fn restore(&self, backup_path: &Path) -> io::Result<()> {
        for entry in std::fs::read_dir(backup_path)? {
            let entry = entry?;
            std::fs::copy(entry.path(), self.project_root.join(entry.file_name()))?;
        }
        debug!("Restored backup from {:?}", backup_path);
        Ok(())
    }

    /// Keep only the `keep` most recent backups.
    ///
    /// Backup names start with an RFC 3339 timestamp, so lexicographic
    /// order is chronological. Prune failures are warnings, never fatal.
    pub fn prune(&self, keep: usize) {
        let entries = match std::fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to list backups for pruning: {}", e);
                return;
            }
        };

        let mut names: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .collect();

        if names.len() <= keep {
            return;
        }

        names.sort();
        names.reverse();

        for stale in &names[keep..] {
            if let Err(e) = std::fs::remove_dir_all(stale) {
                warn!("Failed to prune backup {:?}: {}", stale, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project_with_manifest() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{ "dependencies": { "react": "^18.2.0" } }"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("package-lock.json"), "{ \"lock\": 1 }").unwrap();
        dir
    }

    #[test]
    fn backup_then_restore_leaves_files_byte_identical() {
        let dir = project_with_manifest();
        let store = BackupStore::new(dir.path());
        let original_manifest = std::fs::read(dir.path().join("package.json")).unwrap();
        let original_lock = std::fs::read(dir.path().join("package-lock.json")).unwrap();

        let backup = store.create("react-18.2.5").unwrap();

        // Simulate the install step mutating the tree
        std::fs::write(dir.path().join("package.json"), "{ \"mutated\": true }").unwrap();
        std::fs::write(dir.path().join("package-lock.json"), "{}").unwrap();

        store.restore(&backup).unwrap();

        assert_eq!(
            std::fs::read(dir.path().join("package.json")).unwrap(),
            original_manifest
        );
        assert_eq!(
            std::fs::read(dir.path().join("package-lock.json")).unwrap(),
            original_lock
        );
    }

    #[test]
    fn create_skips_absent_lock_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        let store = BackupStore::new(dir.path());

        let backup = store.create("pkg-1.0.0").unwrap();

        assert!(backup.join("package.json").exists());
        assert!(!backup.join("package-lock.json").exists());
        assert!(!backup.join("npm-shrinkwrap.json").exists());
    }

    #[test]
    fn prune_keeps_most_recent_backups() {
        let dir = project_with_manifest();
        let store = BackupStore::new(dir.path());

        // Backup names sort by creation time; fabricate a lexicographic
        // sequence directly to avoid depending on timestamp granularity.
        let backup_dir = dir.path().join(BACKUP_DIR_NAME);
        std::fs::create_dir_all(&backup_dir).unwrap();
        for i in 0..12 {
            std::fs::create_dir(backup_dir.join(format!("backup-2026-01-{:02}", i + 1))).unwrap();
        }

        store.prune(10);

        let mut remaining: Vec<String> = std::fs::read_dir(&backup_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();

        assert_eq!(remaining.len(), 10);
        // The two oldest are gone
        assert_eq!(remaining[0], "backup-2026-01-03");
    }

    #[test]
    fn prune_is_a_no_op_below_the_limit() {
        let dir = project_with_manifest();
        let store = BackupStore::new(dir.path());
        store.create("a").unwrap();

        store.prune(10);

        let count = std::fs::read_dir(dir.path().join(BACKUP_DIR_NAME))
            .unwrap()
            .count();
        assert_eq!(count, 1);
    }
}
