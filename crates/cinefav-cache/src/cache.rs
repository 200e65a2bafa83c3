use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache connection lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Cache manager using SQLite
///
/// Two tables live in the same file:
/// - `kv`: small string values that must survive a restart (token, profile)
/// - `catalog_details`: JSON blobs of catalog lookups, stamped for TTL checks
///
/// The connection sits behind a mutex so one manager can be shared across
/// tasks; every statement is short, so contention is not a concern.
pub struct CacheManager {
    conn: Mutex<Connection>,
}

impl CacheManager {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        Self::init_schema(&conn)?;
        debug!("Opened cache at {}", db_path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Throwaway database, gone when the manager is dropped
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS catalog_details (
                id INTEGER PRIMARY KEY,
                data TEXT NOT NULL,
                cached_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }

    /// Read a stored value
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Write one value, replacing any previous one
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_many(&[(key, value)])
    }

    /// Write several values in one transaction.
    ///
    /// Either every entry lands or none does, so readers never see a mix of
    /// old and new values.
    pub fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Delete a value; deleting a missing key is not an error
    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Fetch cached details for a catalog id if they are younger than `max_age`
    pub fn get_details<T: DeserializeOwned>(&self, id: u64, max_age: Duration) -> Result<Option<T>> {
        let conn = self.lock()?;
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT data, cached_at FROM catalog_details WHERE id = ?1",
                params![id as i64],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((data, cached_at)) = row else {
            return Ok(None);
        };

        if Utc::now().timestamp().saturating_sub(cached_at) > max_age.num_seconds() {
            debug!("Cached details for {} are stale", id);
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&data)?))
    }

    /// Store details for a catalog id, stamping them with the current time
    pub fn put_details<T: Serialize>(&self, id: u64, details: &T) -> Result<()> {
        let data = serde_json::to_string(details)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO catalog_details (id, data, cached_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data, cached_at = excluded.cached_at",
            params![id as i64, data, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    /// Drop detail rows older than `max_age`, returning how many went
    pub fn purge_expired(&self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now().timestamp().saturating_sub(max_age.num_seconds());
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM catalog_details WHERE cached_at < ?1",
            params![cutoff],
        )?;
        if removed > 0 {
            debug!("Purged {} expired catalog entries", removed);
        }
        Ok(removed)
    }

    #[cfg(test)]
    fn backdate_details(&self, id: u64, seconds: i64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE catalog_details SET cached_at = cached_at - ?1 WHERE id = ?2",
            params![seconds, id as i64],
        )?;
        Ok(())
    }
}
