use serde::{Deserialize, Serialize};

use super::{require, Collection, Record};
use crate::error::{Result, StoreError};

/// Appointment lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
  Pending,
  Confirmed,
  Cancelled,
}

impl AppointmentStatus {
  pub const ALL: [AppointmentStatus; 3] = [
    AppointmentStatus::Pending,
    AppointmentStatus::Confirmed,
    AppointmentStatus::Cancelled,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      AppointmentStatus::Pending => "pending",
      AppointmentStatus::Confirmed => "confirmed",
      AppointmentStatus::Cancelled => "cancelled",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|status| status.as_str() == s)
  }

  /// Only pending appointments move, and only to confirmed or cancelled.
  /// Staying in the same state is always allowed.
  pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
    *self == next || *self == AppointmentStatus::Pending
  }
}

/// A booked consultation between a patient and a doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
  pub id: String,
  pub patient_id: String,
  pub patient_name: String,
  pub doctor_id: String,
  pub doctor_name: String,
  /// Day of the appointment as `DD/MM/YYYY`
  pub date: String,
  pub time: String,
  pub specialty: String,
  pub status: AppointmentStatus,
}

/// Partial change to an appointment; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentUpdate {
  pub patient_name: Option<String>,
  pub doctor_name: Option<String>,
  pub date: Option<String>,
  pub time: Option<String>,
  pub specialty: Option<String>,
  pub status: Option<AppointmentStatus>,
}

impl AppointmentUpdate {
  pub fn status(status: AppointmentStatus) -> Self {
    Self {
      status: Some(status),
      ..Self::default()
    }
  }
}

impl Record for Appointment {
  type Update = AppointmentUpdate;

  const ENTITY: &'static str = "appointment";
  const COLLECTION: Collection = Collection::Appointments;

  fn id(&self) -> &str {
    &self.id
  }

  fn validate(&self) -> Result<()> {
    require(Self::ENTITY, "id", &self.id)?;
    require(Self::ENTITY, "patientId", &self.patient_id)?;
    require(Self::ENTITY, "doctorId", &self.doctor_id)?;
    require(Self::ENTITY, "date", &self.date)?;
    require(Self::ENTITY, "time", &self.time)
  }

  fn apply(&mut self, update: AppointmentUpdate) -> Result<()> {
    if let Some(status) = update.status {
      if !self.status.can_transition_to(status) {
        return Err(StoreError::validation(
          Self::ENTITY,
          format!(
            "cannot move {} from {} to {}",
            self.id,
            self.status.as_str(),
            status.as_str()
          ),
        ));
      }
      self.status = status;
    }
    if let Some(patient_name) = update.patient_name {
      self.patient_name = patient_name;
    }
    if let Some(doctor_name) = update.doctor_name {
      self.doctor_name = doctor_name;
    }
    if let Some(date) = update.date {
      self.date = date;
    }
    if let Some(time) = update.time {
      self.time = time;
    }
    if let Some(specialty) = update.specialty {
      self.specialty = specialty;
    }
    Ok(())
  }
}
