//! # Notification Error Types
//!
//! Structured error types for the notification delivery path. These never
//! reach an HTTP caller; they exist so the publisher and mailer can log
//! precisely what failed before the failure is absorbed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Broker connection error: {message}")]
    Connection { message: String },

    #[error("Broker channel error: {message}")]
    Channel { message: String },

    #[error("Publish failed on exchange {exchange}: {message}")]
    Publish { exchange: String, message: String },

    #[error("Event serialization error: {message}")]
    Serialization { message: String },
}

impl NotificationError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
        }
    }

    pub fn publish(exchange: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            exchange: exchange.into(),
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}
