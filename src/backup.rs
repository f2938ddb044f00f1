//! Whole-data-set snapshots as a single JSON blob.
//!
//! Format:
//! `{ "timestamp": ISO-8601, "data": { "appointments": [...],
//! "notifications": [...], "registeredUsers": [...], "settings": {...} } }`

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{Result, StoreError};
use crate::models::{iso_millis, AppSettings, Appointment, Collection, Notification, Record, User};
use crate::records::RecordStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
  #[serde(default)]
  pub timestamp: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<BackupData>,
}

/// The four collections. Missing or `null` fields decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
  #[serde(default, deserialize_with = "null_as_default")]
  pub appointments: Vec<Appointment>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub notifications: Vec<Notification>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub registered_users: Vec<User>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub settings: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

const BACKUP_KEY: &str = "backup";

fn validate_all<R: Record>(records: &[R]) -> Result<()> {
  records.iter().try_for_each(|r| r.validate())
}

/// Settings are stored raw, but must still decode as [`AppSettings`].
fn validate_settings(settings: &Map<String, Value>) -> Result<()> {
  AppSettings::deserialize(Value::Object(settings.clone()))
    .map(|_| ())
    .map_err(|source| StoreError::Decode {
      key: BACKUP_KEY.to_string(),
      source,
    })
}

impl Backup {
  pub fn parse(blob: &str) -> Result<Self> {
    serde_json::from_str(blob).map_err(|source| StoreError::Decode {
      key: BACKUP_KEY.to_string(),
      source,
    })
  }

  pub fn to_json(&self) -> Result<String> {
    serde_json::to_string(self).map_err(|source| StoreError::Encode {
      key: BACKUP_KEY.to_string(),
      source,
    })
  }
}

impl RecordStore {
  /// Snapshot the four collections.
  ///
  /// Unlike ordinary reads, an unreadable collection fails the backup
  /// instead of being saved as empty.
  pub async fn create_backup(&self) -> Result<String> {
    let data = BackupData {
      appointments: self.try_list().await?,
      notifications: self.try_list().await?,
      registered_users: self.try_list().await?,
      settings: self
        .cache()
        .try_get(Collection::Settings.key())
        .await?
        .unwrap_or_default(),
    };
    let backup = Backup {
      timestamp: iso_millis::format(&Utc::now()),
      data: Some(data),
    };
    info!(
      appointments = backup.data.as_ref().map_or(0, |d| d.appointments.len()),
      "Created backup"
    );
    backup.to_json()
  }

  /// Overwrite the four collections from a backup blob.
  ///
  /// The whole blob is decoded and validated before anything is written. A
  /// blob without `data` restores nothing.
  pub async fn restore_from_backup(&self, blob: &str) -> Result<()> {
    let backup = Backup::parse(blob)?;
    let Some(data) = backup.data else {
      warn!(timestamp = %backup.timestamp, "Backup has no data section, nothing restored");
      return Ok(());
    };

    validate_all(&data.appointments)?;
    validate_all(&data.notifications)?;
    validate_all(&data.registered_users)?;
    validate_settings(&data.settings)?;

    self.save_all(&data.appointments).await?;
    self.save_all(&data.notifications).await?;
    self.save_all(&data.registered_users).await?;
    self.save_raw_settings(&data.settings).await?;

    info!(
      timestamp = %backup.timestamp,
      appointments = data.appointments.len(),
      notifications = data.notifications.len(),
      users = data.registered_users.len(),
      "Restored backup"
    );
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheLayer, FailingStorage, MemoryStorage};
  use crate::models::fixtures::{appointment, user};
  use crate::models::{AppointmentStatus, NewNotification, NotificationType, UserRole};
  use crate::notifications::NotificationService;

  fn store() -> RecordStore {
    RecordStore::new(CacheLayer::new(MemoryStorage::new()))
  }

  async fn populate(store: &RecordStore) {
    store
      .appointments()
      .save_all(&[
        appointment("a1", AppointmentStatus::Pending),
        appointment("a2", AppointmentStatus::Confirmed),
      ])
      .await
      .unwrap();
    store
      .users()
      .save_all(&[user("p1", UserRole::Patient), user("d1", UserRole::Doctor)])
      .await
      .unwrap();
    NotificationService::new(store.clone())
      .create(NewNotification {
        user_id: "p1".to_string(),
        title: "Oi".to_string(),
        message: "msg".to_string(),
        kind: NotificationType::General,
        appointment_id: None,
      })
      .await
      .unwrap();
    let mut settings = Map::new();
    settings.insert("theme".to_string(), Value::from("dark"));
    store.save_raw_settings(&settings).await.unwrap();
  }

  #[tokio::test]
  async fn test_backup_round_trip() {
    let source = store();
    populate(&source).await;
    let blob = source.create_backup().await.unwrap();

    let target = store();
    target.restore_from_backup(&blob).await.unwrap();

    assert_eq!(
      target.appointments().list().await,
      source.appointments().list().await
    );
    assert_eq!(target.users().list().await, source.users().list().await);
    assert_eq!(
      target.notifications().list().await,
      source.notifications().list().await
    );
    assert_eq!(target.raw_settings().await, source.raw_settings().await);
  }

  #[tokio::test]
  async fn test_backup_format() {
    let source = store();
    populate(&source).await;
    let blob = source.create_backup().await.unwrap();

    let json: Value = serde_json::from_str(&blob).unwrap();
    assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    assert_eq!(json["data"]["appointments"].as_array().unwrap().len(), 2);
    assert_eq!(json["data"]["registeredUsers"][0]["id"], "p1");
    assert_eq!(json["data"]["notifications"][0]["type"], "general");
    assert_eq!(json["data"]["settings"]["theme"], "dark");
  }

  #[tokio::test]
  async fn test_backup_of_empty_store() {
    let blob = store().create_backup().await.unwrap();
    let backup = Backup::parse(&blob).unwrap();
    assert_eq!(backup.data, Some(BackupData::default()));
  }

  #[tokio::test]
  async fn test_restore_treats_missing_fields_as_empty() {
    let target = store();
    populate(&target).await;

    target
      .restore_from_backup(r#"{"timestamp":"2024-01-01T00:00:00.000Z","data":{"registeredUsers":null}}"#)
      .await
      .unwrap();

    assert!(target.appointments().list().await.is_empty());
    assert!(target.notifications().list().await.is_empty());
    assert!(target.users().list().await.is_empty());
    assert!(target.raw_settings().await.is_empty());
  }

  #[tokio::test]
  async fn test_restore_without_data_changes_nothing() {
    let target = store();
    populate(&target).await;
    target
      .restore_from_backup(r#"{"timestamp":"2024-01-01T00:00:00.000Z"}"#)
      .await
      .unwrap();
    assert_eq!(target.appointments().list().await.len(), 2);
  }

  #[tokio::test]
  async fn test_malformed_blob_restores_nothing() {
    let target = store();
    populate(&target).await;
    let before = target.create_backup().await.unwrap();

    let err = target.restore_from_backup("{not json").await.unwrap_err();
    assert!(matches!(err, StoreError::Decode { .. }));

    // Valid JSON, but one appointment has an unknown status.
    let bad = r#"{"data":{"appointments":[{"id":"x","patientId":"p","patientName":"P",
      "doctorId":"d","doctorName":"D","date":"01/01/2024","time":"10:00",
      "specialty":"S","status":"archived"}]}}"#;
    assert!(target.restore_from_backup(bad).await.is_err());

    let after: Backup = Backup::parse(&target.create_backup().await.unwrap()).unwrap();
    assert_eq!(after.data, Backup::parse(&before).unwrap().data);
  }

  #[tokio::test]
  async fn test_restore_rejects_invalid_records_before_writing() {
    let target = store();
    populate(&target).await;
    let bad = r#"{"data":{"appointments":[],"registeredUsers":[{"id":"","name":"x","email":"x@y","role":"admin"}]}}"#;
    let err = target.restore_from_backup(bad).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));
    assert_eq!(target.appointments().list().await.len(), 2);
  }

  #[tokio::test]
  async fn test_restore_rejects_mistyped_settings() {
    let target = store();
    populate(&target).await;
    let bad = r#"{"data":{"settings":{"theme":"dark","notifications":"yes","fontScale":2}}}"#;
    let err = target.restore_from_backup(bad).await.unwrap_err();
    assert!(matches!(err, StoreError::Decode { .. }));
    assert_eq!(target.appointments().list().await.len(), 2);
    assert_eq!(target.settings().await.theme, "dark");
    assert!(!target.raw_settings().await.contains_key("fontScale"));
  }

  #[tokio::test]
  async fn test_restored_settings_survive_later_updates() {
    let target = store();
    target
      .restore_from_backup(r#"{"data":{"settings":{"theme":"dark","fontScale":2}}}"#)
      .await
      .unwrap();

    let mut patch = Map::new();
    patch.insert("language".to_string(), Value::from("en"));
    target.update_settings(patch).await.unwrap();

    let raw = target.raw_settings().await;
    assert_eq!(raw.get("theme"), Some(&Value::from("dark")));
    assert_eq!(raw.get("fontScale"), Some(&Value::from(2)));
    assert_eq!(raw.get("language"), Some(&Value::from("en")));
  }

  #[tokio::test]
  async fn test_backup_fails_on_unreadable_storage() {
    let store = RecordStore::new(CacheLayer::new(FailingStorage));
    assert!(store.create_backup().await.is_err());
    let blob = r#"{"data":{}}"#;
    assert!(store.restore_from_backup(blob).await.is_err());
  }
}
