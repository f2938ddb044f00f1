//! Per-user notification log.
//!
//! Notifications are created unread and can only move to read. They never
//! expire; the only way out is an explicit delete.

use chrono::SubsecRound;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::{Clock, SystemClock};
use crate::error::Result;
use crate::models::{
  Appointment, NewNotification, Notification, NotificationType, NotificationUpdate,
};
use crate::records::RecordStore;

#[derive(Clone)]
pub struct NotificationService {
  store: RecordStore,
  clock: Arc<dyn Clock>,
}

impl NotificationService {
  pub fn new(store: RecordStore) -> Self {
    Self {
      store,
      clock: Arc::new(SystemClock),
    }
  }

  /// Replace the clock used to stamp new notifications.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Notifications for `user_id`, most recent first. Equal timestamps keep
  /// insertion order. Unreadable storage yields an empty list.
  pub async fn list(&self, user_id: &str) -> Vec<Notification> {
    let mut notifications: Vec<Notification> = match self.store.try_list().await {
      Ok(all) => all,
      Err(e) => {
        warn!(user_id, error = %e, "Failed to load notifications");
        return Vec::new();
      }
    };
    notifications.retain(|n| n.user_id == user_id);
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    notifications
  }

  /// Store a new unread notification and return it.
  pub async fn create(&self, new: NewNotification) -> Result<Notification> {
    let notification = Notification {
      id: Uuid::new_v4().to_string(),
      user_id: new.user_id,
      title: new.title,
      message: new.message,
      kind: new.kind,
      read: false,
      // Stored with millisecond precision; truncate so the value survives a
      // serialization round trip unchanged.
      created_at: self.clock.now().trunc_subsecs(3),
      appointment_id: new.appointment_id,
    };
    self.store.add(notification.clone()).await?;
    debug!(id = %notification.id, user_id = %notification.user_id, "Created notification");
    Ok(notification)
  }

  /// Mark one notification read. Returns `false` if no such notification.
  pub async fn mark_read(&self, id: &str) -> Result<bool> {
    self
      .store
      .update::<Notification>(id, NotificationUpdate::mark_read())
      .await
  }

  /// Mark every notification of `user_id` read. Returns how many were unread.
  pub async fn mark_all_read(&self, user_id: &str) -> Result<usize> {
    self
      .store
      .mutate(|notifications: &mut Vec<Notification>| {
        let mut marked = 0;
        for n in notifications
          .iter_mut()
          .filter(|n| n.user_id == user_id && !n.read)
        {
          n.read = true;
          marked += 1;
        }
        Ok(marked)
      })
      .await
  }

  pub async fn delete(&self, id: &str) -> Result<bool> {
    self.store.delete::<Notification>(id).await
  }

  pub async fn unread_count(&self, user_id: &str) -> usize {
    self
      .list(user_id)
      .await
      .iter()
      .filter(|n| !n.read)
      .count()
  }

  // ===== Appointment lifecycle templates =====

  /// Tell `patient_id` their appointment was confirmed.
  pub async fn notify_appointment_confirmed(
    &self,
    patient_id: &str,
    appointment: &Appointment,
  ) -> Result<Notification> {
    self
      .create(NewNotification {
        user_id: patient_id.to_string(),
        title: "Consulta Confirmada".to_string(),
        message: format!(
          "Sua consulta com {} foi confirmada para {} às {}.",
          appointment.doctor_name, appointment.date, appointment.time
        ),
        kind: NotificationType::AppointmentConfirmed,
        appointment_id: Some(appointment.id.clone()),
      })
      .await
  }

  /// Tell `patient_id` their appointment was cancelled, with an optional reason.
  pub async fn notify_appointment_cancelled(
    &self,
    patient_id: &str,
    appointment: &Appointment,
    reason: Option<&str>,
  ) -> Result<Notification> {
    let reason = reason
      .filter(|r| !r.is_empty())
      .map(|r| format!(" Motivo: {}", r))
      .unwrap_or_default();
    self
      .create(NewNotification {
        user_id: patient_id.to_string(),
        title: "Consulta Cancelada".to_string(),
        message: format!(
          "Sua consulta com {} foi cancelada.{}",
          appointment.doctor_name, reason
        ),
        kind: NotificationType::AppointmentCancelled,
        appointment_id: Some(appointment.id.clone()),
      })
      .await
  }

  /// Tell `doctor_id` a patient booked with them.
  pub async fn notify_new_appointment(
    &self,
    doctor_id: &str,
    appointment: &Appointment,
  ) -> Result<Notification> {
    self
      .create(NewNotification {
        user_id: doctor_id.to_string(),
        title: "Nova Consulta Agendada".to_string(),
        message: format!(
          "{} agendou uma consulta para {} às {}.",
          appointment.patient_name, appointment.date, appointment.time
        ),
        kind: NotificationType::General,
        appointment_id: Some(appointment.id.clone()),
      })
      .await
  }

  /// Remind `user_id` (patient or doctor) of tomorrow's appointment.
  pub async fn notify_appointment_reminder(
    &self,
    user_id: &str,
    appointment: &Appointment,
  ) -> Result<Notification> {
    let counterpart = if appointment.doctor_name.is_empty() {
      &appointment.patient_name
    } else {
      &appointment.doctor_name
    };
    self
      .create(NewNotification {
        user_id: user_id.to_string(),
        title: "Lembrete de Consulta".to_string(),
        message: format!(
          "Você tem uma consulta agendada para amanhã às {} com {}.",
          appointment.time, counterpart
        ),
        kind: NotificationType::AppointmentReminder,
        appointment_id: Some(appointment.id.clone()),
      })
      .await
  }
}
