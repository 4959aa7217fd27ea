use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::{
    error::NotifierError,
    messages::{self, MessageKind},
    models::Appointment,
    store::EntityStore,
};

pub const REMINDER_TITLE: &str = "📅 Lembrete de Agendamento";

// Platform notification service. Registrations are keyed by appointment id:
// scheduling the same id again replaces the previous registration.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn schedule(
        &self,
        id: &str,
        title: &str,
        body: &str,
        fire_at: DateTime<Utc>,
    ) -> Result<(), NotifierError>;

    async fn cancel(&self, id: &str) -> Result<(), NotifierError>;

    async fn cancel_all(&self) -> Result<(), NotifierError>;
}

pub fn reminder_time(appointment: &Appointment) -> DateTime<Utc> {
    appointment.scheduled_for - Duration::hours(24)
}

// Pure translation from appointment data to notifier calls; holds no
// durable state, so registrations are not re-armed after a restart.
pub struct ReminderScheduler {
    notifier: Arc<dyn Notifier>,
}

impl ReminderScheduler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    pub async fn schedule_reminder(
        &self,
        store: &EntityStore,
        appointment: &Appointment,
    ) -> Result<(), NotifierError> {
        let fire_at = reminder_time(appointment);
        if fire_at <= Utc::now() {
            // Appointments less than 24h out simply get no advance reminder.
            log::debug!(
                "No reminder for appointment {}: fire time {fire_at} already passed",
                appointment.id
            );
            return Ok(());
        }

        let body = match messages::render_message(store, MessageKind::Reminder, appointment).await {
            Ok(body) => body,
            Err(err) => {
                log::warn!("Reminder template lookup failed, using default: {err}");
                messages::render(MessageKind::Reminder.default_template(), appointment)
            }
        };

        self.notifier
            .schedule(&appointment.id, REMINDER_TITLE, &body, fire_at)
            .await?;
        log::info!("Reminder for appointment {} registered at {fire_at}", appointment.id);
        Ok(())
    }

    pub async fn cancel_reminder(&self, appointment_id: &str) -> Result<(), NotifierError> {
        self.notifier.cancel(appointment_id).await?;
        log::info!("Reminder canceled for appointment {appointment_id}");
        Ok(())
    }

    pub async fn cancel_all_reminders(&self) -> Result<(), NotifierError> {
        self.notifier.cancel_all().await
    }
}
