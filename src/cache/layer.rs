//! In-memory cache of decoded values sitting in front of a durable store.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use super::storage::DurableStore;
use super::traits::{CacheEntry, Clock, SystemClock};
use crate::error::{Result, StoreError};

/// Snapshot of what the cache and the durable store currently hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
  /// Number of entries held in memory
  pub cache_size: usize,
  /// Number of keys in the durable store
  pub total_keys: usize,
  /// When each cached entry was stored
  pub last_access: BTreeMap<String, DateTime<Utc>>,
}

/// Deadline `ttl_minutes` after `now`, rejected when it cannot be
/// represented.
fn expiry(now: DateTime<Utc>, ttl_minutes: i64) -> Result<DateTime<Utc>> {
  Duration::try_minutes(ttl_minutes)
    .and_then(|ttl| now.checked_add_signed(ttl))
    .ok_or_else(|| {
      StoreError::validation(
        "cache entry",
        format!("ttl of {} minutes is out of range", ttl_minutes),
      )
    })
}

/// Read accelerator over a [`DurableStore`].
///
/// Writes always go through to the durable store; the in-memory map only
/// saves decoding and I/O on reads. Clones share the same store and map.
#[derive(Clone)]
pub struct CacheLayer {
  storage: Arc<dyn DurableStore>,
  entries: Arc<Mutex<HashMap<String, CacheEntry<Value>>>>,
  clock: Arc<dyn Clock>,
}

impl CacheLayer {
  /// Create a new cache layer with the given storage backend.
  pub fn new<S: DurableStore + 'static>(storage: S) -> Self {
    Self::from_arc(Arc::new(storage))
  }

  pub fn from_arc(storage: Arc<dyn DurableStore>) -> Self {
    Self {
      storage,
      entries: Arc::new(Mutex::new(HashMap::new())),
      clock: Arc::new(SystemClock),
    }
  }

  /// Replace the clock used for expiry.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  // A poisoned map only means a panic happened mid-insert; the entries are
  // still plain values, so keep using them.
  fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<Value>>> {
    self.entries.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Live cached value for `key`, evicting it first if it has expired.
  fn lookup(&self, key: &str) -> Option<Value> {
    let now = self.clock.now();
    let mut entries = self.entries();
    match entries.get(key) {
      Some(entry) if entry.is_expired(now) => {
        debug!(key, "Cache entry expired");
        entries.remove(key);
        None
      }
      Some(entry) => Some(entry.data.clone()),
      None => None,
    }
  }

  /// Write `value` to the durable store and cache it.
  ///
  /// With `ttl_minutes` the cached entry expires that many minutes from now;
  /// the durable copy never expires.
  pub async fn set<T: Serialize + ?Sized>(
    &self,
    key: &str,
    value: &T,
    ttl_minutes: Option<i64>,
  ) -> Result<()> {
    let encoded = serde_json::to_value(value).map_err(|source| StoreError::Encode {
      key: key.to_string(),
      source,
    })?;
    let text = encoded.to_string();
    let now = self.clock.now();
    let expires_at = ttl_minutes.map(|m| expiry(now, m)).transpose()?;

    self.storage.set(key, &text).await?;

    let entry = CacheEntry {
      data: encoded,
      stored_at: now,
      expires_at,
    };
    self.entries().insert(key.to_string(), entry);
    debug!(key, ?ttl_minutes, "Stored value");
    Ok(())
  }

  /// Read `key`, surfacing storage and decode failures.
  ///
  /// Values read back from the durable store are cached without expiry.
  pub async fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
    if let Some(value) = self.lookup(key) {
      match serde_json::from_value(value) {
        Ok(data) => {
          debug!(key, "Cache hit");
          return Ok(Some(data));
        }
        Err(e) => {
          // Cached under a different shape; re-read the durable copy.
          debug!(key, error = %e, "Cached value does not match requested type");
          self.entries().remove(key);
        }
      }
    }

    let Some(text) = self.storage.get(key).await? else {
      debug!(key, "Cache miss, key absent");
      return Ok(None);
    };

    let decode_err = |source| StoreError::Decode {
      key: key.to_string(),
      source,
    };
    let value: Value = serde_json::from_str(&text).map_err(decode_err)?;
    let data = T::deserialize(&value).map_err(decode_err)?;

    let entry = CacheEntry::new(value, self.clock.now(), None);
    self.entries().insert(key.to_string(), entry);
    debug!(key, "Cache miss, loaded from storage");
    Ok(Some(data))
  }

  /// Read `key`, treating any failure as absent.
  pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    match self.try_get(key).await {
      Ok(data) => data,
      Err(e) => {
        warn!(key, error = %e, "Failed to load value, treating as absent");
        None
      }
    }
  }

  /// Read `key`, falling back to `default` when absent or unreadable.
  pub async fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
    self.get(key).await.unwrap_or(default)
  }

  /// Delete `key` from the durable store and the cache.
  pub async fn remove(&self, key: &str) -> Result<()> {
    self.storage.remove(key).await?;
    self.entries().remove(key);
    debug!(key, "Removed value");
    Ok(())
  }

  /// Wipe the durable store and the cache.
  pub async fn clear_all(&self) -> Result<()> {
    self.storage.clear().await?;
    self.entries().clear();
    debug!("Cleared storage and cache");
    Ok(())
  }

  /// Drop every in-memory entry; the durable store is untouched.
  pub fn clear_cache(&self) {
    self.entries().clear();
    debug!("Cleared in-memory cache");
  }

  pub async fn info(&self) -> Result<StorageInfo> {
    let total_keys = self.storage.list_keys().await?.len();
    let entries = self.entries();
    Ok(StorageInfo {
      cache_size: entries.len(),
      total_keys,
      last_access: entries
        .iter()
        .map(|(key, entry)| (key.clone(), entry.stored_at))
        .collect(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::{FailingStorage, MemoryStorage};
  use crate::cache::traits::ManualClock;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Sample {
    name: String,
    count: u32,
  }

  fn sample() -> Sample {
    Sample {
      name: "alpha".to_string(),
      count: 3,
    }
  }

  #[tokio::test]
  async fn test_set_then_get_round_trip() {
    let cache = CacheLayer::new(MemoryStorage::new());
    cache.set("k", &sample(), None).await.unwrap();
    assert_eq!(cache.get::<Sample>("k").await, Some(sample()));
  }

  #[tokio::test]
  async fn test_get_missing_returns_default() {
    let cache = CacheLayer::new(MemoryStorage::new());
    assert_eq!(cache.get::<Sample>("missing").await, None);
    assert_eq!(cache.get_or("missing", vec![1, 2]).await, vec![1, 2]);
  }

  #[tokio::test]
  async fn test_set_writes_through_to_storage() {
    let storage = Arc::new(MemoryStorage::new());
    let cache = CacheLayer::from_arc(storage.clone());
    cache.set("k", &sample(), Some(10)).await.unwrap();

    let raw = storage.get("k").await.unwrap().unwrap();
    let decoded: Sample = serde_json::from_str(&raw).unwrap();
    assert_eq!(decoded, sample());
  }

  #[tokio::test]
  async fn test_read_populates_cache_without_expiry() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set("k", "[1,2,3]").await.unwrap();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let cache = CacheLayer::from_arc(storage.clone()).with_clock(clock.clone());

    assert_eq!(cache.get::<Vec<u8>>("k").await, Some(vec![1, 2, 3]));
    assert_eq!(cache.info().await.unwrap().cache_size, 1);

    // Served from memory even after the durable copy is gone and time moves on.
    storage.remove("k").await.unwrap();
    clock.advance(Duration::days(30));
    assert_eq!(cache.get::<Vec<u8>>("k").await, Some(vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_expired_entry_is_not_served_from_memory() {
    let storage = Arc::new(MemoryStorage::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let cache = CacheLayer::from_arc(storage.clone()).with_clock(clock.clone());

    cache.set("k", &sample(), Some(5)).await.unwrap();
    storage.remove("k").await.unwrap();

    clock.advance(Duration::minutes(4));
    assert_eq!(cache.get::<Sample>("k").await, Some(sample()));

    clock.advance(Duration::minutes(2));
    assert_eq!(cache.get::<Sample>("k").await, None);
    assert_eq!(cache.info().await.unwrap().cache_size, 0);
  }

  #[tokio::test]
  async fn test_expired_entry_refetches_durable_copy() {
    let storage = Arc::new(MemoryStorage::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let cache = CacheLayer::from_arc(storage.clone()).with_clock(clock.clone());

    cache.set("k", &1u32, Some(1)).await.unwrap();
    storage.set("k", "2").await.unwrap();
    assert_eq!(cache.get::<u32>("k").await, Some(1));

    clock.advance(Duration::minutes(2));
    assert_eq!(cache.get::<u32>("k").await, Some(2));
  }

  #[tokio::test]
  async fn test_remove_deletes_everywhere() {
    let storage = Arc::new(MemoryStorage::new());
    let cache = CacheLayer::from_arc(storage.clone());
    cache.set("k", &sample(), None).await.unwrap();

    cache.remove("k").await.unwrap();
    assert_eq!(cache.get::<Sample>("k").await, None);
    assert_eq!(storage.get("k").await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_clear_cache_keeps_durable_data() {
    let storage = Arc::new(MemoryStorage::new());
    let cache = CacheLayer::from_arc(storage.clone());
    cache.set("k", &1u32, None).await.unwrap();

    // Changed behind the cache's back.
    storage.set("k", "7").await.unwrap();
    assert_eq!(cache.get::<u32>("k").await, Some(1));

    cache.clear_cache();
    assert_eq!(cache.get::<u32>("k").await, Some(7));
  }

  #[tokio::test]
  async fn test_clear_all_wipes_storage_and_cache() {
    let storage = Arc::new(MemoryStorage::new());
    let cache = CacheLayer::from_arc(storage.clone());
    cache.set("a", &1u32, None).await.unwrap();
    cache.set("b", &2u32, None).await.unwrap();

    cache.clear_all().await.unwrap();
    let info = cache.info().await.unwrap();
    assert_eq!(info.cache_size, 0);
    assert_eq!(info.total_keys, 0);
  }

  #[tokio::test]
  async fn test_write_failures_propagate() {
    let cache = CacheLayer::new(FailingStorage);
    assert!(matches!(
      cache.set("k", &1u32, None).await,
      Err(StoreError::Io(_))
    ));
    assert!(matches!(cache.remove("k").await, Err(StoreError::Io(_))));
    assert!(matches!(cache.clear_all().await, Err(StoreError::Io(_))));
  }

  #[tokio::test]
  async fn test_out_of_range_ttl_is_rejected_before_writing() {
    let storage = Arc::new(MemoryStorage::new());
    let cache = CacheLayer::from_arc(storage.clone());

    let err = cache
      .set("k", &1u32, Some(1_000_000_000_000))
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));
    assert!(matches!(
      cache.set("k", &1u32, Some(i64::MAX)).await,
      Err(StoreError::Validation { .. })
    ));
    assert_eq!(storage.get("k").await.unwrap(), None);
    assert!(cache.entries().is_empty());

    cache.set("k", &1u32, Some(60)).await.unwrap();
    assert_eq!(cache.get::<u32>("k").await, Some(1));
  }

  #[tokio::test]
  async fn test_failed_set_does_not_cache() {
    let cache = CacheLayer::new(FailingStorage);
    let _ = cache.set("k", &1u32, None).await;
    assert!(cache.entries().is_empty());
  }

  #[tokio::test]
  async fn test_read_failures_degrade_to_default() {
    let cache = CacheLayer::new(FailingStorage);
    assert_eq!(cache.get::<u32>("k").await, None);
    assert_eq!(cache.get_or("k", 9u32).await, 9);
    assert!(cache.try_get::<u32>("k").await.is_err());
  }

  #[tokio::test]
  async fn test_corrupt_value_is_a_decode_error() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set("k", "{not json").await.unwrap();
    let cache = CacheLayer::from_arc(storage);

    assert!(matches!(
      cache.try_get::<Sample>("k").await,
      Err(StoreError::Decode { .. })
    ));
    assert_eq!(cache.get_or("k", sample()).await, sample());
  }

  #[tokio::test]
  async fn test_info_reports_last_access() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let cache = CacheLayer::new(MemoryStorage::new()).with_clock(clock.clone());
    cache.set("a", &1u32, None).await.unwrap();
    let stored_at = clock.now();
    clock.advance(Duration::minutes(1));
    cache.set("b", &2u32, None).await.unwrap();

    let info = cache.info().await.unwrap();
    assert_eq!(info.cache_size, 2);
    assert_eq!(info.total_keys, 2);
    assert_eq!(info.last_access.get("a"), Some(&stored_at));
  }
}
