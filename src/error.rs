use thiserror::Error;

use crate::models::Status;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("storage path error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
#[error("notifier error: {0}")]
pub struct NotifierError(String);

impl NotifierError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error)]
pub enum AgendaError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("no record with id {id}")]
    NotFound { id: String },
    #[error("appointment is already {from}, no further status change is allowed")]
    InvalidTransition { from: Status },
    #[error(transparent)]
    Store(#[from] StoreError),
}
