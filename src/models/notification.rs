use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{iso_millis, require, Collection, Record};
use crate::error::{Result, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
  AppointmentConfirmed,
  AppointmentCancelled,
  AppointmentReminder,
  General,
}

impl NotificationType {
  pub fn as_str(&self) -> &'static str {
    match self {
      NotificationType::AppointmentConfirmed => "appointment_confirmed",
      NotificationType::AppointmentCancelled => "appointment_cancelled",
      NotificationType::AppointmentReminder => "appointment_reminder",
      NotificationType::General => "general",
    }
  }
}

/// Entry in a user's notification log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  pub id: String,
  pub user_id: String,
  pub title: String,
  pub message: String,
  #[serde(rename = "type")]
  pub kind: NotificationType,
  pub read: bool,
  #[serde(with = "iso_millis")]
  pub created_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub appointment_id: Option<String>,
}

/// The caller-supplied part of a notification; id, timestamp and read state
/// are assigned on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
  pub user_id: String,
  pub title: String,
  pub message: String,
  pub kind: NotificationType,
  pub appointment_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationUpdate {
  pub read: Option<bool>,
}

impl NotificationUpdate {
  pub fn mark_read() -> Self {
    Self { read: Some(true) }
  }
}

impl Record for Notification {
  type Update = NotificationUpdate;

  const ENTITY: &'static str = "notification";
  const COLLECTION: Collection = Collection::Notifications;

  fn id(&self) -> &str {
    &self.id
  }

  fn validate(&self) -> Result<()> {
    require(Self::ENTITY, "id", &self.id)?;
    require(Self::ENTITY, "userId", &self.user_id)?;
    require(Self::ENTITY, "title", &self.title)
  }

  fn apply(&mut self, update: NotificationUpdate) -> Result<()> {
    match update.read {
      Some(false) if self.read => Err(StoreError::validation(
        Self::ENTITY,
        format!("{} is already read", self.id),
      )),
      Some(read) => {
        self.read = read;
        Ok(())
      }
      None => Ok(()),
    }
  }
}
