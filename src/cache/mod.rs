//! Generic caching layer for local data persistence.
//!
//! This module provides:
//! - A [`DurableStore`] abstraction over string key-value persistence, with
//!   SQLite and in-memory backends
//! - A [`CacheLayer`] that keeps decoded values in memory with optional expiry
//! - Write-through semantics: every write reaches the durable store

mod layer;
mod storage;
mod traits;

pub use layer::{CacheLayer, StorageInfo};
pub use storage::{DurableStore, MemoryStorage, SqliteStorage};
pub use traits::{CacheEntry, Clock, SystemClock};

#[cfg(test)]
pub(crate) use storage::FailingStorage;
#[cfg(test)]
pub(crate) use traits::ManualClock;
