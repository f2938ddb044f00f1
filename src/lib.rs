//! Local data layer for a medical appointment scheduling app.
//!
//! A [`cache::CacheLayer`] sits over a pluggable [`cache::DurableStore`];
//! the [`records::RecordStore`] keeps typed collections on top of it, and
//! the notification, statistics and backup services build on the record
//! store.

pub mod backup;
pub mod cache;
pub mod error;
pub mod keys;
pub mod models;
pub mod notifications;
pub mod records;
pub mod statistics;

pub use backup::{Backup, BackupData};
pub use cache::{CacheLayer, DurableStore, MemoryStorage, SqliteStorage};
pub use error::{Result, StoreError};
pub use notifications::NotificationService;
pub use records::RecordStore;
pub use statistics::StatisticsService;
