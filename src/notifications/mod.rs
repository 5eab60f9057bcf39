//! # Notification Delivery
//!
//! The task-mutation notification path: payload construction
//! ([`event`]), AMQP publishing ([`publisher`]), SMTP fallback
//! ([`mailer`]), and the change-detection orchestration tying them
//! together ([`dispatcher`]). Delivery is best-effort end to end; a task
//! mutation commits whether or not its notifications go out.

pub mod dispatcher;
pub mod error;
pub mod event;
pub mod mailer;
pub mod publisher;

pub use dispatcher::{NotificationDispatcher, TaskSnapshot};
pub use error::NotificationError;
pub use event::{
    DeletedTask, EventKind, Initiator, NotificationEvent, Priority, RecipientInfo,
};
pub use mailer::{FallbackMailer, SmtpFallbackMailer};
pub use publisher::{AmqpEventPublisher, EventPublisher};
