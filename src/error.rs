//! Error types for the taskboard service.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskboardError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Identity error: {0}")]
    IdentityError(String),
    #[error("Notification error: {0}")]
    NotificationError(String),
}

impl From<sqlx::Error> for TaskboardError {
    fn from(err: sqlx::Error) -> Self {
        TaskboardError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for TaskboardError {
    fn from(err: serde_json::Error) -> Self {
        TaskboardError::ValidationError(format!("JSON serialization error: {err}"))
    }
}

impl From<crate::notifications::NotificationError> for TaskboardError {
    fn from(err: crate::notifications::NotificationError) -> Self {
        TaskboardError::NotificationError(err.to_string())
    }
}

impl From<crate::identity::IdentityError> for TaskboardError {
    fn from(err: crate::identity::IdentityError) -> Self {
        TaskboardError::IdentityError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TaskboardError>;
