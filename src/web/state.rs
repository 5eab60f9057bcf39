//! # Web API Application State
//!
//! Shared state handed to every handler: configuration, the database pool,
//! the identity client, and the notification dispatcher.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::TaskboardConfig;
use crate::error::Result;
use crate::identity::{HttpIdentityClient, UserIdentityService};
use crate::notifications::{
    AmqpEventPublisher, NotificationDispatcher, SmtpFallbackMailer,
};

/// Shared application state for web API handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TaskboardConfig>,
    pub db_pool: PgPool,
    pub identity: Arc<dyn UserIdentityService>,
    pub dispatcher: Arc<NotificationDispatcher>,
}

impl AppState {
    /// Build the full state graph from configuration, connecting the
    /// database pool eagerly so startup fails fast on a bad DATABASE_URL.
    pub async fn from_config(config: TaskboardConfig) -> Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;

        info!(
            max_connections = config.database_max_connections,
            "Database pool connected"
        );

        let identity: Arc<dyn UserIdentityService> =
            Arc::new(HttpIdentityClient::new(&config.user_service)?);

        let publisher = Arc::new(AmqpEventPublisher::new(config.amqp.clone()));
        let mailer = Arc::new(SmtpFallbackMailer::new(&config.smtp)?);
        let dispatcher = Arc::new(NotificationDispatcher::new(
            publisher,
            mailer,
            identity.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            identity,
            dispatcher,
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("bind_address", &self.config.bind_address)
            .finish()
    }
}
