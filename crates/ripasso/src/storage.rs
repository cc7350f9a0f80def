//! Local key/value storage for JSON-encoded state
//!
//! This module handles:
//! - The string-keyed store interface used by persistence
//! - The SQLite backend and its migrations
//! - An in-memory backend for tests

use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    Poisoned,

    #[cfg(test)]
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// A string-keyed store of string values, like a browser's local storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace the value under `key`
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Schema migrations, applied in order and recorded by version
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial_schema",
    include_str!("../db/migrations/001_initial_schema.sql"),
)];

/// SQLite-backed store, one row per key
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the database at the given path, running any pending migrations
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

        let count = run_migrations(&conn)?;
        if count > 0 {
            info!(count = count, path = %db_path.display(), "Applied migrations");
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Count stored keys
    #[cfg(test)]
    pub fn count_keys(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM storage", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn()?
            .query_row("SELECT value FROM storage WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn()?.execute(
            "INSERT INTO storage (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn()?
            .execute("DELETE FROM storage WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// Run pending embedded migrations, returning how many were applied
pub fn run_migrations(conn: &Connection) -> anyhow::Result<usize> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
             version TEXT PRIMARY KEY NOT NULL,
             applied_at TEXT NOT NULL
         );",
    )
    .context("Failed to create schema_migrations table")?;

    let mut applied = 0;

    for (version, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
            [version],
            |row| row.get(0),
        )?;

        if already_applied {
            continue;
        }

        conn.execute_batch(sql)
            .with_context(|| format!("Failed to apply migration: {}", version))?;

        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, datetime('now'))",
            [version],
        )?;

        debug!(version = %version, "Applied migration");
        applied += 1;
    }

    Ok(applied)
}

/// In-memory store. Can be told to reject writes, or to fail a number of
/// reads before recovering, to exercise the best-effort paths.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<std::collections::HashMap<String, String>>,
    reject_writes: bool,
    failing_reads: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_writes() -> Self {
        Self {
            reject_writes: true,
            ..Default::default()
        }
    }

    /// Fail the next `count` reads, then read normally
    pub fn failing_next_reads(self, count: usize) -> Self {
        self.failing_reads
            .store(count, std::sync::atomic::Ordering::SeqCst);
        self
    }

    /// Seed a raw value, bypassing `reject_writes`
    pub fn with(self, key: &str, value: &str) -> Self {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
        self
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        use std::sync::atomic::Ordering;

        let failing = self
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(StorageError::Unavailable("database is busy".to_string()));
        }

        let values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.reject_writes {
            return Err(StorageError::Unavailable("quota exceeded".to_string()));
        }
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.reject_writes {
            return Err(StorageError::Unavailable("storage is read-only".to_string()));
        }
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_store() -> (TempDir, SqliteStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&temp_dir.path().join("test.db")).unwrap();
        (temp_dir, store)
    }

    // ========== open / migration tests ==========

    #[test]
    fn test_open_creates_tables() {
        let (_temp_dir, store) = setup_test_store();
        let conn = store.conn().unwrap();

        let table_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='storage'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(table_exists);
    }

    #[test]
    fn test_open_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let first = SqliteStore::open(&db_path).unwrap();
        first.set("mocks", "[]").unwrap();
        drop(first);

        let second = SqliteStore::open(&db_path).unwrap();
        assert_eq!(second.get("mocks").unwrap().as_deref(), Some("[]"));
        assert_eq!(second.count_keys().unwrap(), 1);
    }

    #[test]
    fn test_migrations_recorded_once() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(run_migrations(&conn).unwrap(), MIGRATIONS.len());
        assert_eq!(run_migrations(&conn).unwrap(), 0);
    }

    // ========== get / set / remove tests ==========

    #[test]
    fn test_get_missing_key() {
        let (_temp_dir, store) = setup_test_store();
        assert!(store.get("completedDays").unwrap().is_none());
    }

    #[test]
    fn test_set_then_get() {
        let (_temp_dir, store) = setup_test_store();
        store.set("completedSubjects", "[1,2]").unwrap();
        assert_eq!(
            store.get("completedSubjects").unwrap().as_deref(),
            Some("[1,2]")
        );
    }

    #[test]
    fn test_set_replaces_value() {
        let (_temp_dir, store) = setup_test_store();
        store.set("topicNotes", "{}").unwrap();
        store.set("topicNotes", r#"{"1-0":"x"}"#).unwrap();

        assert_eq!(
            store.get("topicNotes").unwrap().as_deref(),
            Some(r#"{"1-0":"x"}"#)
        );
        assert_eq!(store.count_keys().unwrap(), 1);
    }

    #[test]
    fn test_remove() {
        let (_temp_dir, store) = setup_test_store();
        store.set("completedDays", "{}").unwrap();
        store.remove("completedDays").unwrap();

        assert!(store.get("completedDays").unwrap().is_none());
        // Removing again is fine
        store.remove("completedDays").unwrap();
    }

    // ========== MemoryStore tests ==========

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        store.remove("a").unwrap();
        assert!(store.get("a").unwrap().is_none());
    }

    #[test]
    fn test_memory_store_failing_reads_recover() {
        let store = MemoryStore::new().with("a", "1").failing_next_reads(2);

        assert!(store.get("a").is_err());
        assert!(store.get("a").is_err());
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_memory_store_rejecting_writes() {
        let store = MemoryStore::rejecting_writes().with("a", "1");

        assert!(store.set("a", "2").is_err());
        assert!(store.remove("a").is_err());
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    }
}
