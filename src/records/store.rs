//! Typed collections over the cache layer.

use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::cache::CacheLayer;
use crate::error::{Result, StoreError};
use crate::models::{AppSettings, Appointment, Collection, Notification, Record, User};

/// Typed CRUD over the fixed collections.
///
/// Each collection is a single serialized list under one key, so every
/// mutation rewrites the whole list. Mutations of one collection are
/// serialized; readers never wait.
#[derive(Clone)]
pub struct RecordStore {
  cache: CacheLayer,
  locks: Arc<[Mutex<()>; Collection::COUNT]>,
  /// Expiry applied to the cached copy of every collection write
  ttl_minutes: Option<i64>,
}

impl RecordStore {
  pub fn new(cache: CacheLayer) -> Self {
    Self {
      cache,
      locks: Arc::new(std::array::from_fn(|_| Mutex::new(()))),
      ttl_minutes: None,
    }
  }

  /// Set the cache expiry for collection writes.
  pub fn with_ttl_minutes(mut self, ttl_minutes: Option<i64>) -> Self {
    self.ttl_minutes = ttl_minutes;
    self
  }

  pub fn cache(&self) -> &CacheLayer {
    &self.cache
  }

  pub(crate) async fn lock(&self, collection: Collection) -> MutexGuard<'_, ()> {
    self.locks[collection.index()].lock().await
  }

  pub fn appointments(&self) -> Records<'_, Appointment> {
    Records::new(self)
  }

  pub fn users(&self) -> Records<'_, User> {
    Records::new(self)
  }

  pub fn notifications(&self) -> Records<'_, Notification> {
    Records::new(self)
  }

  // ===== Generic collection access =====

  /// All records, or an empty list if the collection is absent or unreadable.
  pub async fn list<R: Record>(&self) -> Vec<R> {
    self.cache.get_or(R::COLLECTION.key(), Vec::new()).await
  }

  /// All records, surfacing storage and decode failures.
  pub async fn try_list<R: Record>(&self) -> Result<Vec<R>> {
    Ok(
      self
        .cache
        .try_get(R::COLLECTION.key())
        .await?
        .unwrap_or_default(),
    )
  }

  /// Replace the whole collection.
  pub async fn save_all<R: Record>(&self, records: &[R]) -> Result<()> {
    let _guard = self.lock(R::COLLECTION).await;
    self.write(records).await
  }

  pub(crate) async fn write<R: Record>(&self, records: &[R]) -> Result<()> {
    self
      .cache
      .set(R::COLLECTION.key(), records, self.ttl_minutes)
      .await
  }

  /// Read-modify-write the collection under its lock.
  ///
  /// The list is read strictly: a collection that cannot be decoded is
  /// never overwritten. If `f` fails nothing is written.
  pub async fn mutate<R, T, F>(&self, f: F) -> Result<T>
  where
    R: Record,
    F: FnOnce(&mut Vec<R>) -> Result<T>,
  {
    let _guard = self.lock(R::COLLECTION).await;
    let mut records = self.try_list::<R>().await?;
    let out = f(&mut records)?;
    self.write(&records).await?;
    Ok(out)
  }

  /// Append a record after validating it. Ids must be unique.
  pub async fn add<R: Record>(&self, record: R) -> Result<()> {
    record.validate()?;
    self
      .mutate(|records: &mut Vec<R>| {
        if records.iter().any(|r| r.id() == record.id()) {
          return Err(StoreError::DuplicateId {
            entity: R::ENTITY,
            id: record.id().to_string(),
          });
        }
        debug!(entity = R::ENTITY, id = record.id(), "Adding record");
        records.push(record);
        Ok(())
      })
      .await
  }

  /// Patch the record with `id`. Returns `false` (and changes nothing) when
  /// no record has that id.
  pub async fn update<R: Record>(&self, id: &str, update: R::Update) -> Result<bool> {
    self
      .mutate(|records: &mut Vec<R>| {
        let Some(slot) = records.iter_mut().find(|r| r.id() == id) else {
          debug!(entity = R::ENTITY, id, "Update skipped, no such record");
          return Ok(false);
        };
        let mut patched = slot.clone();
        patched.apply(update)?;
        patched.validate()?;
        *slot = patched;
        Ok(true)
      })
      .await
  }

  /// Remove the record with `id`. Returns whether one was removed.
  pub async fn delete<R: Record>(&self, id: &str) -> Result<bool> {
    self
      .mutate(|records: &mut Vec<R>| {
        let before = records.len();
        records.retain(|r| r.id() != id);
        Ok(records.len() != before)
      })
      .await
  }

  /// Find one record by id.
  pub async fn find<R: Record>(&self, id: &str) -> Option<R> {
    self.list::<R>().await.into_iter().find(|r| r.id() == id)
  }

  // ===== Settings =====

  /// Stored settings object as-is, or an empty object.
  pub async fn raw_settings(&self) -> Map<String, Value> {
    self
      .cache
      .get_or(Collection::Settings.key(), Map::new())
      .await
  }

  pub async fn save_raw_settings(&self, settings: &Map<String, Value>) -> Result<()> {
    let _guard = self.lock(Collection::Settings).await;
    self
      .cache
      .set(Collection::Settings.key(), settings, self.ttl_minutes)
      .await
  }

  /// Typed settings, with defaults for anything not stored.
  pub async fn settings(&self) -> AppSettings {
    self
      .cache
      .get_or(Collection::Settings.key(), AppSettings::default())
      .await
  }

  /// Merge `patch` over the stored settings and store the result.
  ///
  /// The stored object is read strictly and the merged result must decode
  /// as [`AppSettings`]; on any failure nothing is written.
  pub async fn update_settings(&self, patch: Map<String, Value>) -> Result<AppSettings> {
    let key = Collection::Settings.key();
    let _guard = self.lock(Collection::Settings).await;

    let mut merged: Map<String, Value> = self.cache.try_get(key).await?.unwrap_or_default();
    merged.extend(patch);

    let updated: AppSettings =
      serde_json::from_value(Value::Object(merged)).map_err(|source| StoreError::Decode {
        key: key.to_string(),
        source,
      })?;
    self.cache.set(key, &updated, self.ttl_minutes).await?;
    Ok(updated)
  }
}

/// Typed handle on one collection of a [`RecordStore`].
pub struct Records<'a, R> {
  store: &'a RecordStore,
  _record: PhantomData<R>,
}

impl<'a, R: Record> Records<'a, R> {
  fn new(store: &'a RecordStore) -> Self {
    Self {
      store,
      _record: PhantomData,
    }
  }

  pub async fn list(&self) -> Vec<R> {
    self.store.list().await
  }

  pub async fn save_all(&self, records: &[R]) -> Result<()> {
    self.store.save_all(records).await
  }

  pub async fn add(&self, record: R) -> Result<()> {
    self.store.add(record).await
  }

  pub async fn update(&self, id: &str, update: R::Update) -> Result<bool> {
    self.store.update::<R>(id, update).await
  }

  pub async fn delete(&self, id: &str) -> Result<bool> {
    self.store.delete::<R>(id).await
  }

  pub async fn find(&self, id: &str) -> Option<R> {
    self.store.find(id).await
  }
}
