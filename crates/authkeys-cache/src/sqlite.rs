//! SQLite-backed cache shared by concurrent `authkeys` processes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use authkeys_api::{AuthkeysError, CacheEntry, CacheStore};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, trace};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS cache (
    key       TEXT PRIMARY KEY NOT NULL,
    validator TEXT NOT NULL,
    payload   TEXT NOT NULL
)";

/// How long a writer waits on another process's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// Each `set` is a single upsert statement, so readers in other processes see
/// either the old `(validator, payload)` pair or the new one, never a mix.
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteCacheStore {
    /// Open (creating if needed) the cache database at `path`.
    ///
    /// Safe to race against another process doing the same: both the parent
    /// directory and the table are created only if absent.
    pub fn open(path: &Path) -> Result<Self, AuthkeysError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| {
                AuthkeysError::CacheUnavailable(format!("failed to create {}: {e}", dir.display()))
            })?;
        }
        let conn = Connection::open(path).map_err(|e| {
            AuthkeysError::CacheUnavailable(format!("failed to open {}: {e}", path.display()))
        })?;
        let store = Self::init(conn, Some(path.to_path_buf()))?;
        debug!(path = %path.display(), "cache opened");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, AuthkeysError> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, AuthkeysError> {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(unavailable)?;
        conn.execute(SCHEMA, []).map_err(unavailable)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, AuthkeysError> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| AuthkeysError::CacheUnavailable("cache connection poisoned".to_string()))?;
        f(&guard).map_err(unavailable)
    }
}

impl CacheStore for SqliteCacheStore {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, AuthkeysError> {
        let entry = self.with_conn(|conn| {
            conn.query_row(
                "SELECT validator, payload FROM cache WHERE key = ?1",
                params![key],
                |row| {
                    Ok(CacheEntry {
                        validator: row.get(0)?,
                        payload: row.get(1)?,
                    })
                },
            )
            .optional()
        })?;
        trace!(key, hit = entry.is_some(), "cache lookup");
        Ok(entry)
    }

    fn set(&self, key: &str, validator: &str, payload: &str) -> Result<(), AuthkeysError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO cache (key, validator, payload) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                    validator = excluded.validator,
                    payload = excluded.payload",
                params![key, validator, payload],
            )
        })?;
        trace!(key, validator, "cache updated");
        Ok(())
    }
}

fn unavailable(e: rusqlite::Error) -> AuthkeysError {
    AuthkeysError::CacheUnavailable(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_none() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        assert_eq!(store.get("github/nobody").unwrap(), None);
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        store.set("github/alice", "\"etag-1\"", "[]").unwrap();
        assert_eq!(
            store.get("github/alice").unwrap(),
            Some(CacheEntry {
                validator: "\"etag-1\"".to_string(),
                payload: "[]".to_string(),
            })
        );
    }

    #[test]
    fn second_set_replaces_entry() {
        let store = SqliteCacheStore::open_in_memory().unwrap();
        store.set("k", "v1", "payload one").unwrap();
        store.set("k", "v2", "two").unwrap();
        let entry = store.get("k").unwrap().unwrap();
        assert_eq!(entry.validator, "v2");
        assert_eq!(entry.payload, "two");
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.sqlite3");
        {
            let store = SqliteCacheStore::open(&path).unwrap();
            assert_eq!(store.path(), Some(path.as_path()));
            store.set("filename//etc/keys", "123", "ssh-rsa AAAA x").unwrap();
        }
        let reopened = SqliteCacheStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("filename//etc/keys").unwrap().unwrap().payload,
            "ssh-rsa AAAA x"
        );
    }

    #[test]
    fn concurrent_openers_share_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite3");
        let a = SqliteCacheStore::open(&path).unwrap();
        let b = SqliteCacheStore::open(&path).unwrap();
        a.set("k", "v", "p").unwrap();
        assert_eq!(b.get("k").unwrap().unwrap().validator, "v");
    }

    #[test]
    fn unopenable_path_is_cache_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let err = SqliteCacheStore::open(&blocker.join("cache.sqlite3"))
            .err()
            .unwrap();
        assert!(matches!(err, AuthkeysError::CacheUnavailable(_)));
    }
}
