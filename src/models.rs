use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CLIENTS: &str = "clients";
pub const APPOINTMENTS: &str = "appointments";

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// Records are stored by value inside their collection; the id is the only
// field the store itself ever inspects.
pub trait Record {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceKind {
    #[serde(rename = "Corte e Barba")]
    CorteEBarba,
    #[serde(rename = "Só Corte")]
    SoCorte,
    #[serde(rename = "Só Barba")]
    SoBarba,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 3] = [
        ServiceKind::CorteEBarba,
        ServiceKind::SoCorte,
        ServiceKind::SoBarba,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ServiceKind::CorteEBarba => "Corte e Barba",
            ServiceKind::SoCorte => "Só Corte",
            ServiceKind::SoBarba => "Só Barba",
        }
    }

    // Suggested charge when an appointment is completed.
    pub fn default_price(self) -> f64 {
        match self {
            ServiceKind::CorteEBarba => 35.0,
            ServiceKind::SoCorte => 25.0,
            ServiceKind::SoBarba => 20.0,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Scheduled,
    Completed,
    Canceled,
}

impl Status {
    // Completed and Canceled are terminal: no transition leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Completed | Status::Canceled)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Scheduled => "scheduled",
            Status::Completed => "completed",
            Status::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl Record for Client {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub client_id: String,
    // Snapshot of the client at booking time; kept displayable even if the
    // client record is later removed.
    pub client_name: String,
    pub client_phone: String,
    pub scheduled_for: DateTime<Utc>,
    pub service: ServiceKind,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_paid: Option<f64>,
    #[serde(default)]
    pub notification_sent: bool,
    pub created_at: DateTime<Utc>,
}

impl Record for Appointment {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_lowercase() {
        let encoded = serde_json::to_string(&Status::Scheduled).unwrap();
        assert_eq!(encoded, r#""scheduled""#);
        let decoded: Status = serde_json::from_str(r#""canceled""#).unwrap();
        assert_eq!(decoded, Status::Canceled);
    }

    #[test]
    fn service_kind_uses_display_labels() {
        let encoded = serde_json::to_string(&ServiceKind::SoCorte).unwrap();
        assert_eq!(encoded, r#""Só Corte""#);
        assert_eq!(ServiceKind::CorteEBarba.to_string(), "Corte e Barba");
    }

    #[test]
    fn terminal_statuses() {
        assert!(!Status::Scheduled.is_terminal());
        assert!(Status::Completed.is_terminal());
        assert!(Status::Canceled.is_terminal());
    }

    #[test]
    fn absent_value_paid_is_omitted() {
        let appointment = Appointment {
            id: new_id(),
            client_id: new_id(),
            client_name: "Ana".to_string(),
            client_phone: "11999998888".to_string(),
            scheduled_for: Utc::now(),
            service: ServiceKind::SoCorte,
            status: Status::Scheduled,
            value_paid: None,
            notification_sent: false,
            created_at: Utc::now(),
        };
        let encoded = serde_json::to_string(&appointment).unwrap();
        assert!(!encoded.contains("value_paid"));
    }
}
