//! Appointment lifecycle and reminder scheduling core for a barbershop app:
//! persisted clients and appointments, the scheduled/completed/canceled
//! state machine, 24h-before reminders, and templated outbound messages.

pub mod agenda;
pub mod error;
pub mod messages;
pub mod models;
pub mod reminder;
pub mod store;

pub use agenda::Agenda;
pub use error::{AgendaError, NotifierError, StoreError};
pub use messages::MessageKind;
pub use models::{new_id, Appointment, Client, Record, ServiceKind, Status};
pub use reminder::{Notifier, ReminderScheduler};
pub use store::EntityStore;
