//! Durable store trait with SQLite and in-memory implementations.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use crate::error::{Result, StoreError};

/// Crash-persistent mapping from string keys to UTF-8 text.
///
/// The data layer does its own serialization on top of this; a store only
/// ever sees opaque strings.
#[async_trait]
pub trait DurableStore: Send + Sync {
  /// Read a value. `Ok(None)` when the key is absent.
  async fn get(&self, key: &str) -> Result<Option<String>>;

  /// Write a value, replacing any previous one.
  async fn set(&self, key: &str, value: &str) -> Result<()>;

  /// Delete a key. Deleting an absent key is not an error.
  async fn remove(&self, key: &str) -> Result<()>;

  /// Delete every key.
  async fn clear(&self) -> Result<()>;

  /// All keys currently stored.
  async fn list_keys(&self) -> Result<Vec<String>>;
}

/// Store kept in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
  values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn values(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
    self
      .values
      .lock()
      .map_err(|e| StoreError::io(format!("Lock poisoned: {}", e)))
  }
}

#[async_trait]
impl DurableStore for MemoryStorage {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    Ok(self.values()?.get(key).cloned())
  }

  async fn set(&self, key: &str, value: &str) -> Result<()> {
    self.values()?.insert(key.to_string(), value.to_string());
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<()> {
    self.values()?.remove(key);
    Ok(())
  }

  async fn clear(&self) -> Result<()> {
    self.values()?.clear();
    Ok(())
  }

  async fn list_keys(&self) -> Result<Vec<String>> {
    Ok(self.values()?.keys().cloned().collect())
  }
}

/// SQLite-backed store: one row per key.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

/// Schema for the key-value table.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SqliteStorage {
  /// Open (or create) a store at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| StoreError::io(format!("Failed to create data directory: {}", e)))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      StoreError::io(format!(
        "Failed to open database at {}: {}",
        path.display(),
        e
      ))
    })?;

    Self::from_connection(conn)
  }

  /// Open a store that lives only as long as this value.
  pub fn open_in_memory() -> Result<Self> {
    Self::from_connection(Connection::open_in_memory()?)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  fn run_migrations(&self) -> Result<()> {
    self
      .conn()?
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| StoreError::io(format!("Failed to run migrations: {}", e)))
  }

  fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| StoreError::io(format!("Lock poisoned: {}", e)))
  }
}

#[async_trait]
impl DurableStore for SqliteStorage {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self.conn()?;
    let value = conn
      .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
        row.get(0)
      })
      .optional()?;
    Ok(value)
  }

  async fn set(&self, key: &str, value: &str) -> Result<()> {
    self.conn()?.execute(
      "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?, ?, datetime('now'))",
      params![key, value],
    )?;
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<()> {
    self
      .conn()?
      .execute("DELETE FROM kv WHERE key = ?", params![key])?;
    Ok(())
  }

  async fn clear(&self) -> Result<()> {
    self.conn()?.execute("DELETE FROM kv", [])?;
    Ok(())
  }

  async fn list_keys(&self) -> Result<Vec<String>> {
    let conn = self.conn()?;
    let mut stmt = conn.prepare("SELECT key FROM kv ORDER BY key")?;
    let keys = stmt
      .query_map([], |row| row.get(0))?
      .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(keys)
  }
}

/// Store whose every operation fails, for exercising error paths.
#[cfg(test)]
pub struct FailingStorage;

#[cfg(test)]
#[async_trait]
impl DurableStore for FailingStorage {
  async fn get(&self, _key: &str) -> Result<Option<String>> {
    Err(StoreError::io("disk unavailable"))
  }

  async fn set(&self, _key: &str, _value: &str) -> Result<()> {
    Err(StoreError::io("disk unavailable"))
  }

  async fn remove(&self, _key: &str) -> Result<()> {
    Err(StoreError::io("disk unavailable"))
  }

  async fn clear(&self) -> Result<()> {
    Err(StoreError::io("disk unavailable"))
  }

  async fn list_keys(&self) -> Result<Vec<String>> {
    Err(StoreError::io("disk unavailable"))
  }
}
