//! Data models for the scheduling domain.
//!
//! - `Appointment`, `AppointmentStatus`: bookings and their lifecycle
//! - `User`, `UserRole`: registered accounts
//! - `Notification`, `NotificationType`: per-user event log entries
//! - `AppSettings`: application preferences
//!
//! Records stored as collections implement [`Record`].

pub mod appointment;
pub mod notification;
pub mod settings;
pub mod user;

pub use appointment::{Appointment, AppointmentStatus, AppointmentUpdate};
pub use notification::{NewNotification, Notification, NotificationType, NotificationUpdate};
pub use settings::AppSettings;
pub use user::{User, UserRole, UserUpdate};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Result, StoreError};
use crate::keys;

/// The record sets persisted as one serialized unit each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
  Appointments,
  RegisteredUsers,
  Notifications,
  Settings,
}

impl Collection {
  pub const COUNT: usize = 4;

  pub const ALL: [Collection; Collection::COUNT] = [
    Collection::Appointments,
    Collection::RegisteredUsers,
    Collection::Notifications,
    Collection::Settings,
  ];

  /// Durable-store key the whole collection lives under.
  pub fn key(&self) -> &'static str {
    match self {
      Collection::Appointments => keys::APPOINTMENTS,
      Collection::RegisteredUsers => keys::REGISTERED_USERS,
      Collection::Notifications => keys::NOTIFICATIONS,
      Collection::Settings => keys::APP_SETTINGS,
    }
  }

  pub(crate) fn index(&self) -> usize {
    *self as usize
  }
}

/// A record kept in an ordered collection and identified by a string id.
pub trait Record: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Partial change accepted by `update`.
  type Update: Send;

  /// Entity name used in error messages (e.g., "appointment")
  const ENTITY: &'static str;

  const COLLECTION: Collection;

  fn id(&self) -> &str;

  /// Structural checks run before a record is written.
  fn validate(&self) -> Result<()>;

  /// Apply `update` in place, rejecting changes the record does not allow.
  fn apply(&mut self, update: Self::Update) -> Result<()>;
}

fn require(entity: &'static str, field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(StoreError::validation(entity, format!("{} is required", field)));
  }
  Ok(())
}

/// ISO-8601 UTC timestamps with millisecond precision and a `Z` suffix.
pub(crate) mod iso_millis {
  use chrono::{DateTime, SecondsFormat, Utc};
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn format(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
  }

  pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(value))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let s = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&s)
      .map(|dt| dt.with_timezone(&Utc))
      .map_err(serde::de::Error::custom)
  }
}
