//! Durable latest-version cache

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

#[cfg(test)]
use mockall::automock;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::config::CACHE_KEY_PREFIX;
use crate::version::error::CacheError;

/// Trait for storing and retrieving the last known latest version of a package
#[cfg_attr(test, automock)]
pub trait VersionStore: Send + Sync + 'static {
    /// Get the cached latest version for a package
    fn get_latest_version(&self, package_name: &str) -> Result<Option<String>, CacheError>;

    /// Store (or overwrite) the latest version for a package
    fn save_latest_version(&self, package_name: &str, version: &str) -> Result<(), CacheError>;
}

/// Build the storage key for a package name
pub fn cache_key(package_name: &str) -> String {
    format!("{}_{}", CACHE_KEY_PREFIX, package_name)
}

/// SQLite-backed [`VersionStore`]
pub struct Cache {
    conn: Mutex<Connection>,
}

impl Cache {
    pub fn new(db_path: &Path) -> Result<Self, CacheError> {
        info!("Initializing cache database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        debug!("Database connection established");
        Self::with_connection(conn)
    }

    /// Cache that lives only as long as the process, used for isolated runs
    pub fn in_memory() -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CacheError> {
        let cache = Self {
            conn: Mutex::new(conn),
        };

        cache.create_schema()?;
        info!("Cache initialized successfully");

        Ok(cache)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS latest_versions (
                key TEXT PRIMARY KEY,
                version TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        debug!("Database schema created successfully");
        Ok(())
    }
}

impl VersionStore for Cache {
    fn get_latest_version(&self, package_name: &str) -> Result<Option<String>, CacheError> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            "SELECT version FROM latest_versions WHERE key = ?1",
            [cache_key(package_name)],
            |row| row.get(0),
        );

        match result {
            Ok(version) => Ok(Some(version)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_latest_version(&self, package_name: &str, version: &str) -> Result<(), CacheError> {
        let now = chrono::Utc::now().timestamp_millis();
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            INSERT INTO latest_versions (key, version, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                version = excluded.version,
                updated_at = excluded.updated_at
            "#,
            (cache_key(package_name), version, now),
        )?;

        debug!("Saved latest version {} for {}", version, package_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn create_cache() -> (TempDir, Cache) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let cache = Cache::new(&db_path).unwrap();
        (temp_dir, cache)
    }

    #[rstest]
    #[case("left-pad", "dep-package_left-pad")]
    #[case("@types/node", "dep-package_@types/node")]
    fn cache_key_prefixes_namespace(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(cache_key(name), expected);
    }

    #[test]
    fn get_latest_version_returns_none_for_unknown_package() {
        let (_temp_dir, cache) = create_cache();

        assert_eq!(cache.get_latest_version("left-pad").unwrap(), None);
    }

    #[test]
    fn save_latest_version_creates_entry() {
        let (_temp_dir, cache) = create_cache();

        cache.save_latest_version("left-pad", "1.3.0").unwrap();

        assert_eq!(
            cache.get_latest_version("left-pad").unwrap(),
            Some("1.3.0".to_string())
        );
    }

    #[test]
    fn save_latest_version_overwrites_existing_entry() {
        let (_temp_dir, cache) = create_cache();

        cache.save_latest_version("left-pad", "1.2.0").unwrap();
        cache.save_latest_version("left-pad", "1.3.0").unwrap();

        assert_eq!(
            cache.get_latest_version("left-pad").unwrap(),
            Some("1.3.0".to_string())
        );
    }

    #[test]
    fn entries_are_kept_per_package() {
        let (_temp_dir, cache) = create_cache();

        cache.save_latest_version("react", "18.2.0").unwrap();
        cache.save_latest_version("lodash", "4.17.21").unwrap();

        assert_eq!(
            cache.get_latest_version("react").unwrap(),
            Some("18.2.0".to_string())
        );
        assert_eq!(
            cache.get_latest_version("lodash").unwrap(),
            Some("4.17.21".to_string())
        );
    }

    #[test]
    fn entries_survive_reopening_the_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        {
            let cache = Cache::new(&db_path).unwrap();
            cache.save_latest_version("left-pad", "1.3.0").unwrap();
        }

        let reopened = Cache::new(&db_path).unwrap();
        assert_eq!(
            reopened.get_latest_version("left-pad").unwrap(),
            Some("1.3.0".to_string())
        );
    }

    #[test]
    fn in_memory_caches_are_isolated() {
        let first = Cache::in_memory().unwrap();
        let second = Cache::in_memory().unwrap();

        first.save_latest_version("left-pad", "1.3.0").unwrap();

        assert_eq!(second.get_latest_version("left-pad").unwrap(), None);
    }
}
