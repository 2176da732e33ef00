//! SQLite-backed version cache
//!
//! Stores the most recent registry observation per package together with
//! the time it was stored, so detection can decide whether a cached record
//! is still fresh for a caller-supplied TTL. Writes are whole-record
//! replacements: a later fetch simply overwrites an earlier one.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::version::error::CacheError;
use crate::version::types::VersionRecord;

pub struct Cache {
    conn: Mutex<Connection>,
}

impl Cache {
    /// Open (or create) the cache database at `db_path`.
    ///
    /// Failure here is fatal to the run: without a cache directory the
    /// detection contract cannot be honored.
    pub fn new(db_path: &Path) -> Result<Self, CacheError> {
        info!("Initializing version cache at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        debug!("Database connection established");

        let cache = Self {
            conn: Mutex::new(conn),
        };

        cache.create_schema()?;
        info!("Version cache initialized");

        Ok(cache)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    /// Get current timestamp in milliseconds since UNIX epoch
    fn current_timestamp_ms() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        debug!("Creating cache schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                package_name TEXT PRIMARY KEY,
                latest TEXT NOT NULL,
                published TEXT,
                breaking INTEGER NOT NULL DEFAULT 0,
                stored_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_stored_at ON records(stored_at)",
            [],
        )?;

        debug!("Cache schema ready");
        Ok(())
    }

    /// Look up the cached record for a package.
    ///
    /// A corrupt or unreadable row is treated as a miss, never as a fatal
    /// error; callers always fall through to a live fetch.
    pub fn get(&self, package_name: &str) -> Result<Option<VersionRecord>, CacheError> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            "SELECT latest, published, breaking FROM records WHERE package_name = ?1",
            [package_name],
            |row| {
                Ok(VersionRecord {
                    package: package_name.to_string(),
                    latest: row.get(0)?,
                    published: row.get(1)?,
                    breaking: row.get::<_, i64>(2)? != 0,
                })
            },
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(rusqlite::Error::InvalidColumnType(..)) | Err(rusqlite::Error::FromSqlConversionFailure(..)) => {
                warn!("Corrupt cache entry for {}, treating as miss", package_name);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Store a record, replacing any previous one for the same package.
    pub fn put(&self, record: &VersionRecord) -> Result<(), CacheError> {
        self.put_at(record, Self::current_timestamp_ms())
    }

    fn put_at(&self, record: &VersionRecord, stored_at_ms: i64) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO records (package_name, latest, published, breaking, stored_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(package_name) DO UPDATE SET
                latest = excluded.latest,
                published = excluded.published,
                breaking = excluded.breaking,
                stored_at = excluded.stored_at
            "#,
            (
                &record.package,
                &record.latest,
                &record.published,
                record.breaking as i64,
                stored_at_ms,
            ),
        )?;
        Ok(())
    }

    /// Whether the cached record for a package is still within `ttl_ms`.
    ///
    /// Valid iff `now - stored_at < ttl_ms`. An absent entry is invalid.
    pub fn is_valid(&self, package_name: &str, ttl_ms: i64) -> Result<bool, CacheError> {
        self.is_valid_at(package_name, ttl_ms, Self::current_timestamp_ms())
    }

    fn is_valid_at(&self, package_name: &str, ttl_ms: i64, now_ms: i64) -> Result<bool, CacheError> {
        let conn = self.lock_conn()?;
        let stored_at: Option<i64> = match conn.query_row(
            "SELECT stored_at FROM records WHERE package_name = ?1",
            [package_name],
            |row| row.get(0),
        ) {
            Ok(v) => Some(v),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };

        Ok(stored_at.is_some_and(|t| now_ms - t < ttl_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_cache() -> (TempDir, Cache) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let cache = Cache::new(&db_path).unwrap();
        (temp_dir, cache)
    }

    fn record(package: &str, latest: &str) -> VersionRecord {
        VersionRecord {
            package: package.to_string(),
            latest: latest.to_string(),
            published: Some("2026-01-15T00:00:00.000Z".to_string()),
            breaking: false,
        }
    }

    #[test]
    fn get_returns_none_for_missing_package() {
        let (_temp_dir, cache) = create_test_cache();
        assert_eq!(cache.get("left-pad").unwrap(), None);
    }

    #[test]
    fn put_then_get_round_trips_record() {
        let (_temp_dir, cache) = create_test_cache();
        let rec = record("react", "18.2.5");

        cache.put(&rec).unwrap();

        assert_eq!(cache.get("react").unwrap(), Some(rec));
    }

    #[test]
    fn put_replaces_existing_record_whole() {
        let (_temp_dir, cache) = create_test_cache();
        cache.put(&record("react", "18.2.5")).unwrap();

        let newer = VersionRecord {
            package: "react".to_string(),
            latest: "19.0.0".to_string(),
            published: None,
            breaking: true,
        };
        cache.put(&newer).unwrap();

        // Last write wins, including fields the first write had set
        assert_eq!(cache.get("react").unwrap(), Some(newer));
    }

    #[test]
    fn is_valid_honors_ttl_boundary() {
        let (_temp_dir, cache) = create_test_cache();
        let stored_at = 1_000_000;
        let ttl = 5_000;
        cache.put_at(&record("react", "18.2.5"), stored_at).unwrap();

        // Valid for any check time in [T, T+ttl)
        assert!(cache.is_valid_at("react", ttl, stored_at).unwrap());
        assert!(cache.is_valid_at("react", ttl, stored_at + ttl - 1).unwrap());
        // Invalid at T+ttl and after
        assert!(!cache.is_valid_at("react", ttl, stored_at + ttl).unwrap());
        assert!(!cache.is_valid_at("react", ttl, stored_at + ttl + 1).unwrap());
    }

    #[test]
    fn is_valid_returns_false_for_missing_package() {
        let (_temp_dir, cache) = create_test_cache();
        assert!(!cache.is_valid("missing", 86_400_000).unwrap());
    }

    #[test]
    fn scoped_package_names_are_distinct_keys() {
        let (_temp_dir, cache) = create_test_cache();
        cache.put(&record("@supabase/supabase-js", "2.39.0")).unwrap();
        cache.put(&record("@stripe/stripe-js", "3.0.1")).unwrap();

        assert_eq!(
            cache.get("@supabase/supabase-js").unwrap().unwrap().latest,
            "2.39.0"
        );
        assert_eq!(
            cache.get("@stripe/stripe-js").unwrap().unwrap().latest,
            "3.0.1"
        );
    }
}
