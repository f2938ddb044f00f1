//! Summary metrics over the appointment collection.
//!
//! Everything here is recomputed on every call; nothing is cached or
//! persisted.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

use crate::models::{Appointment, AppointmentStatus};
use crate::records::RecordStore;

/// Share of appointments in each status, as percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatusPercentages {
  pub confirmed: f64,
  pub pending: f64,
  pub cancelled: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
  pub total: usize,
  pub confirmed: usize,
  pub pending: usize,
  pub cancelled: usize,
}

impl StatusCounts {
  pub fn tally<'a>(appointments: impl IntoIterator<Item = &'a Appointment>) -> Self {
    let mut counts = Self::default();
    for appointment in appointments {
      counts.total += 1;
      match appointment.status {
        AppointmentStatus::Confirmed => counts.confirmed += 1,
        AppointmentStatus::Pending => counts.pending += 1,
        AppointmentStatus::Cancelled => counts.cancelled += 1,
      }
    }
    counts
  }

  /// All zero when there are no appointments.
  pub fn percentages(&self) -> StatusPercentages {
    if self.total == 0 {
      return StatusPercentages::default();
    }
    let pct = |n: usize| n as f64 / self.total as f64 * 100.0;
    StatusPercentages {
      confirmed: pct(self.confirmed),
      pending: pct(self.pending),
      cancelled: pct(self.cancelled),
    }
  }
}

/// Statistics across every appointment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralStatistics {
  pub total_appointments: usize,
  pub confirmed_appointments: usize,
  pub pending_appointments: usize,
  pub cancelled_appointments: usize,
  pub total_patients: usize,
  pub total_doctors: usize,
  pub specialties: BTreeMap<String, usize>,
  /// Keyed by `MM/YYYY`
  pub appointments_by_month: BTreeMap<String, usize>,
  pub status_percentages: StatusPercentages,
}

/// Statistics for one doctor's appointments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorStatistics {
  pub total_appointments: usize,
  pub confirmed_appointments: usize,
  pub pending_appointments: usize,
  pub cancelled_appointments: usize,
  pub total_patients: usize,
  pub status_percentages: StatusPercentages,
}

/// Statistics for one patient's appointments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientStatistics {
  pub total_appointments: usize,
  pub confirmed_appointments: usize,
  pub pending_appointments: usize,
  pub cancelled_appointments: usize,
  pub total_doctors: usize,
  pub specialties: BTreeMap<String, usize>,
  pub status_percentages: StatusPercentages,
}

fn distinct<'a>(values: impl IntoIterator<Item = &'a str>) -> usize {
  values.into_iter().collect::<HashSet<_>>().len()
}

fn specialties<'a>(appointments: impl IntoIterator<Item = &'a Appointment>) -> BTreeMap<String, usize> {
  let mut counts = BTreeMap::new();
  for appointment in appointments {
    *counts.entry(appointment.specialty.clone()).or_insert(0) += 1;
  }
  counts
}

/// `DD/MM/YYYY` to `MM/YYYY`. Anything not made of three non-empty
/// slash-separated parts is rejected. Parts are used exactly as written.
pub fn month_key(date: &str) -> Option<String> {
  let parts: Vec<&str> = date.split('/').collect();
  match parts.as_slice() {
    [day, month, year] if !day.is_empty() && !month.is_empty() && !year.is_empty() => {
      Some(format!("{}/{}", month, year))
    }
    _ => None,
  }
}

fn appointments_by_month<'a>(
  appointments: impl IntoIterator<Item = &'a Appointment>,
) -> BTreeMap<String, usize> {
  let mut counts = BTreeMap::new();
  for appointment in appointments {
    match month_key(&appointment.date) {
      Some(key) => *counts.entry(key).or_insert(0) += 1,
      None => warn!(
        appointment_id = %appointment.id,
        date = %appointment.date,
        "Skipping appointment with malformed date"
      ),
    }
  }
  counts
}

pub fn general_statistics(appointments: &[Appointment]) -> GeneralStatistics {
  let counts = StatusCounts::tally(appointments);
  GeneralStatistics {
    total_appointments: counts.total,
    confirmed_appointments: counts.confirmed,
    pending_appointments: counts.pending,
    cancelled_appointments: counts.cancelled,
    total_patients: distinct(appointments.iter().map(|a| a.patient_id.as_str())),
    total_doctors: distinct(appointments.iter().map(|a| a.doctor_id.as_str())),
    specialties: specialties(appointments),
    appointments_by_month: appointments_by_month(appointments),
    status_percentages: counts.percentages(),
  }
}

pub fn doctor_statistics(appointments: &[Appointment], doctor_id: &str) -> DoctorStatistics {
  let scoped: Vec<&Appointment> = appointments
    .iter()
    .filter(|a| a.doctor_id == doctor_id)
    .collect();
  let counts = StatusCounts::tally(scoped.iter().copied());
  DoctorStatistics {
    total_appointments: counts.total,
    confirmed_appointments: counts.confirmed,
    pending_appointments: counts.pending,
    cancelled_appointments: counts.cancelled,
    total_patients: distinct(scoped.iter().map(|a| a.patient_id.as_str())),
    status_percentages: counts.percentages(),
  }
}

pub fn patient_statistics(appointments: &[Appointment], patient_id: &str) -> PatientStatistics {
  let scoped: Vec<&Appointment> = appointments
    .iter()
    .filter(|a| a.patient_id == patient_id)
    .collect();
  let counts = StatusCounts::tally(scoped.iter().copied());
  PatientStatistics {
    total_appointments: counts.total,
    confirmed_appointments: counts.confirmed,
    pending_appointments: counts.pending,
    cancelled_appointments: counts.cancelled,
    total_doctors: distinct(scoped.iter().map(|a| a.doctor_id.as_str())),
    specialties: specialties(scoped.iter().copied()),
    status_percentages: counts.percentages(),
  }
}

/// Computes statistics from the appointments currently in the record store.
/// An unreadable collection is treated as empty.
#[derive(Clone)]
pub struct StatisticsService {
  store: RecordStore,
}

impl StatisticsService {
  pub fn new(store: RecordStore) -> Self {
    Self { store }
  }

  pub async fn general(&self) -> GeneralStatistics {
    general_statistics(&self.store.appointments().list().await)
  }

  pub async fn for_doctor(&self, doctor_id: &str) -> DoctorStatistics {
    doctor_statistics(&self.store.appointments().list().await, doctor_id)
  }

  pub async fn for_patient(&self, patient_id: &str) -> PatientStatistics {
    patient_statistics(&self.store.appointments().list().await, patient_id)
  }
}
