//! # Fallback Email Sender
//!
//! Best-effort SMTP delivery used only when the broker publish fails. Every
//! failure here is logged and swallowed: email is the channel of last resort
//! and must never fail the originating request.

use async_trait::async_trait;
use lettre::{
    message::Mailbox,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, error, warn};

use crate::config::SmtpConfig;
use crate::error::{Result, TaskboardError};
use crate::notifications::event::NotificationEvent;

/// Last-resort delivery seam, fire-and-forget by contract
#[async_trait]
pub trait FallbackMailer: Send + Sync {
    async fn send_fallback(&self, event: &NotificationEvent);
}

/// SMTP-backed fallback mailer
pub struct SmtpFallbackMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpFallbackMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from: Mailbox = config.from_address.parse().map_err(|e| {
            TaskboardError::ConfigurationError(format!(
                "invalid SMTP from address '{}': {}",
                config.from_address, e
            ))
        })?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .timeout(Some(std::time::Duration::from_millis(config.timeout_ms)));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, event: &NotificationEvent) -> Option<Message> {
        let mut builder = Message::builder().from(self.from.clone());
        let mut addressed = false;

        for recipient in &event.recipients {
            match recipient.parse::<Mailbox>() {
                Ok(mailbox) => {
                    builder = builder.to(mailbox);
                    addressed = true;
                }
                Err(e) => {
                    warn!(recipient = %recipient, error = %e, "Skipping unparseable recipient");
                }
            }
        }

        if !addressed {
            return None;
        }

        match builder.subject(&event.subject).body(event.content.clone()) {
            Ok(message) => Some(message),
            Err(e) => {
                error!(task_id = %event.task_id, error = %e, "Failed to build fallback email");
                None
            }
        }
    }
}

#[async_trait]
impl FallbackMailer for SmtpFallbackMailer {
    async fn send_fallback(&self, event: &NotificationEvent) {
        if event.recipients.is_empty() {
            debug!(task_id = %event.task_id, "No recipients for fallback email, skipping");
            return;
        }

        let Some(message) = self.build_message(event) else {
            return;
        };

        match self.transport.send(message).await {
            Ok(_) => {
                debug!(
                    task_id = %event.task_id,
                    recipients = event.recipients.len(),
                    "Sent fallback email"
                );
            }
            Err(e) => {
                error!(
                    task_id = %event.task_id,
                    recipients = event.recipients.len(),
                    error = %e,
                    "Fallback email delivery failed"
                );
            }
        }
    }
}

impl std::fmt::Debug for SmtpFallbackMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpFallbackMailer")
            .field("from", &self.from)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::event::{DeletedTask, RecipientInfo};
    use uuid::Uuid;

    fn mailer() -> SmtpFallbackMailer {
        SmtpFallbackMailer::new(&SmtpConfig {
            host: "localhost".to_string(),
            port: 2525,
            from_address: "taskboard@example.com".to_string(),
            timeout_ms: 500,
            username: None,
            password: None,
        })
        .unwrap()
    }

    fn event_with_recipients(recipients: Vec<String>) -> NotificationEvent {
        let deleted = DeletedTask {
            id: Uuid::new_v4(),
            title: "probe".to_string(),
            assignee_id: None,
            project_id: None,
            deleted_by: None,
            deleted_by_name: None,
        };
        let mut event = NotificationEvent::task_deleted(&deleted, &RecipientInfo::default());
        event.recipients = recipients;
        event
    }

    #[test]
    fn test_invalid_from_address_rejected() {
        let result = SmtpFallbackMailer::new(&SmtpConfig {
            from_address: "not an address".to_string(),
            ..SmtpConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_message_built_from_valid_recipients() {
        let event = event_with_recipients(vec![
            "alice@example.com".to_string(),
            "admin@example.com".to_string(),
        ]);
        assert!(mailer().build_message(&event).is_some());
    }

    #[test]
    fn test_unparseable_recipients_are_skipped() {
        let event = event_with_recipients(vec![
            "<<broken".to_string(),
            "alice@example.com".to_string(),
        ]);
        assert!(mailer().build_message(&event).is_some());
    }

    #[test]
    fn test_no_valid_recipients_yields_no_message() {
        let event = event_with_recipients(vec!["<<broken".to_string()]);
        assert!(mailer().build_message(&event).is_none());
    }

    #[tokio::test]
    async fn test_send_with_empty_recipients_is_noop() {
        // Must return without attempting a connection.
        mailer().send_fallback(&event_with_recipients(vec![])).await;
    }

    #[tokio::test]
    #[ignore = "requires local SMTP server on port 2525"]
    async fn test_send_against_local_smtp() {
        mailer()
            .send_fallback(&event_with_recipients(vec!["alice@example.com".to_string()]))
            .await;
    }
}
