use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    error::AgendaError,
    models::{new_id, Appointment, Client, ServiceKind, Status, APPOINTMENTS, CLIENTS},
    reminder::{Notifier, ReminderScheduler},
    store::EntityStore,
};

// Sole authority for state transitions. Domain writes commit before any
// notifier call, and a notifier failure never unwinds a committed write.
pub struct Agenda {
    store: EntityStore,
    reminders: ReminderScheduler,
}

impl Agenda {
    pub fn new(store: EntityStore, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            reminders: ReminderScheduler::new(notifier),
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub async fn add_client(&self, name: &str, phone: &str) -> Result<Client, AgendaError> {
        let name = name.trim();
        if name.chars().count() < 2 {
            return Err(AgendaError::Validation(
                "client name must have at least 2 characters".to_string(),
            ));
        }

        let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
        if digits.len() < 10 {
            return Err(AgendaError::Validation(
                "client phone must have at least 10 digits".to_string(),
            ));
        }

        let client = Client {
            id: new_id(),
            name: name.to_string(),
            phone: digits,
            created_at: Utc::now(),
        };
        self.store.add_one(CLIENTS, client.clone()).await?;
        log::info!("Registered client {} ({})", client.name, client.id);
        Ok(client)
    }

    pub async fn remove_client(&self, id: &str) -> Result<(), AgendaError> {
        let removed = self.store.remove_one::<Client>(CLIENTS, id).await?;
        if !removed {
            return Err(AgendaError::NotFound { id: id.to_string() });
        }
        // Appointments keep their embedded client snapshot; removal does not
        // cascade.
        log::info!("Removed client {id}");
        Ok(())
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>, AgendaError> {
        let mut clients: Vec<Client> = self.store.load_all(CLIENTS).await?;
        clients.sort_by_key(|client| client.name.to_lowercase());
        Ok(clients)
    }

    pub async fn find_client(&self, id: &str) -> Result<Option<Client>, AgendaError> {
        let clients: Vec<Client> = self.store.load_all(CLIENTS).await?;
        Ok(clients.into_iter().find(|client| client.id == id))
    }

    pub async fn create_appointment(
        &self,
        client_id: &str,
        scheduled_for: DateTime<Utc>,
        service: ServiceKind,
    ) -> Result<Appointment, AgendaError> {
        if scheduled_for <= Utc::now() {
            return Err(AgendaError::Validation(
                "appointment time must be in the future".to_string(),
            ));
        }
        let client = self.find_client(client_id).await?.ok_or_else(|| {
            AgendaError::Validation(format!("unknown client {client_id}"))
        })?;

        let appointment = Appointment {
            id: new_id(),
            client_id: client.id.clone(),
            client_name: client.name.clone(),
            client_phone: client.phone.clone(),
            scheduled_for,
            service,
            status: Status::Scheduled,
            value_paid: None,
            notification_sent: false,
            created_at: Utc::now(),
        };
        self.store.add_one(APPOINTMENTS, appointment.clone()).await?;
        log::info!(
            "Appointment {} booked for {} at {scheduled_for}",
            appointment.id,
            appointment.client_name
        );

        // Only after the write commits; a failed registration must not fail
        // the booking.
        if let Err(err) = self.reminders.schedule_reminder(&self.store, &appointment).await {
            log::warn!("Reminder scheduling failed for {}: {err}", appointment.id);
        }

        Ok(appointment)
    }

    pub async fn cancel_appointment(&self, id: &str) -> Result<(), AgendaError> {
        self.transition(id, |appointment| {
            appointment.status = Status::Canceled;
        })
        .await?;
        log::info!("Appointment {id} canceled");

        // The status change above is authoritative even if this cannot be
        // confirmed.
        if let Err(err) = self.reminders.cancel_reminder(id).await {
            log::warn!("Reminder cancellation failed for {id}: {err}");
        }
        Ok(())
    }

    pub async fn complete_appointment(&self, id: &str, value_paid: f64) -> Result<(), AgendaError> {
        self.transition(id, |appointment| {
            appointment.status = Status::Completed;
            appointment.value_paid = Some(value_paid);
        })
        .await?;
        log::info!("Appointment {id} completed, charged {value_paid:.2}");
        Ok(())
    }

    pub async fn list_upcoming(&self) -> Result<Vec<Appointment>, AgendaError> {
        let now = Utc::now();
        let mut upcoming: Vec<Appointment> = self
            .store
            .load_all::<Appointment>(APPOINTMENTS)
            .await?
            .into_iter()
            .filter(|a| a.status == Status::Scheduled && a.scheduled_for > now)
            .collect();
        // Stable sort: same-time appointments keep insertion order.
        upcoming.sort_by_key(|a| a.scheduled_for);
        Ok(upcoming)
    }

    pub async fn list_all(&self) -> Result<Vec<Appointment>, AgendaError> {
        let mut appointments: Vec<Appointment> = self.store.load_all(APPOINTMENTS).await?;
        appointments.sort_by_key(|a| a.scheduled_for);
        Ok(appointments)
    }

    pub async fn list_by_client(&self, client_id: &str) -> Result<Vec<Appointment>, AgendaError> {
        let mut appointments: Vec<Appointment> = self
            .store
            .load_all::<Appointment>(APPOINTMENTS)
            .await?
            .into_iter()
            .filter(|a| a.client_id == client_id)
            .collect();
        appointments.sort_by_key(|a| a.scheduled_for);
        Ok(appointments)
    }

    pub async fn find_appointment(&self, id: &str) -> Result<Option<Appointment>, AgendaError> {
        let appointments: Vec<Appointment> = self.store.load_all(APPOINTMENTS).await?;
        Ok(appointments.into_iter().find(|a| a.id == id))
    }

    // Check-then-mutate under the collection write lock; only Scheduled
    // appointments may move, and a rejected transition persists nothing new.
    async fn transition(
        &self,
        id: &str,
        apply: impl FnOnce(&mut Appointment) + Send,
    ) -> Result<(), AgendaError> {
        self.store
            .with_collection(APPOINTMENTS, |appointments: &mut Vec<Appointment>| {
                let appointment = appointments
                    .iter_mut()
                    .find(|a| a.id == id)
                    .ok_or_else(|| AgendaError::NotFound { id: id.to_string() })?;
                if appointment.status != Status::Scheduled {
                    return Err(AgendaError::InvalidTransition {
                        from: appointment.status,
                    });
                }
                apply(appointment);
                Ok(())
            })
            .await
    }
}
