//! Shape checks for records that arrive as untyped JSON.

use serde_json::Value;

use crate::models::{AppointmentStatus, UserRole};

fn is_string(value: &Value, field: &str) -> bool {
  value.get(field).is_some_and(Value::is_string)
}

/// String `id`, `patientId`, `doctorId`, `date` and `time`, and a known
/// `status`.
pub fn validate_appointment(value: &Value) -> bool {
  value.is_object()
    && ["id", "patientId", "doctorId", "date", "time"]
      .iter()
      .all(|field| is_string(value, field))
    && value
      .get("status")
      .and_then(Value::as_str)
      .and_then(AppointmentStatus::parse)
      .is_some()
}

/// String `id`, `name` and `email`, and a known `role`.
pub fn validate_user(value: &Value) -> bool {
  value.is_object()
    && ["id", "name", "email"]
      .iter()
      .all(|field| is_string(value, field))
    && value
      .get("role")
      .and_then(Value::as_str)
      .and_then(UserRole::parse)
      .is_some()
}
