//! # User Service HTTP Client
//!
//! reqwest-based implementation of [`UserIdentityService`]. One client is
//! built at startup with the configured timeout and reused for all lookups.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::{IdentityError, UserIdentityService, UserRecord};
use crate::config::UserServiceConfig;
use crate::error::{Result, TaskboardError};

#[derive(Clone)]
pub struct HttpIdentityClient {
    client: Client,
    base_url: Url,
}

impl std::fmt::Debug for HttpIdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIdentityClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl HttpIdentityClient {
    /// Create a new identity client with the given configuration
    pub fn new(config: &UserServiceConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            TaskboardError::ConfigurationError(format!("Invalid user service URL: {e}"))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(format!("taskboard/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                TaskboardError::ConfigurationError(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { client, base_url })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        auth: Option<&str>,
        operation: &str,
    ) -> std::result::Result<T, IdentityError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| IdentityError::Transport(format!("invalid URL: {e}")))?;

        debug!(url = %url, operation = %operation, "User service lookup");

        let mut request = self.client.get(url);
        if let Some(auth) = auth {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl UserIdentityService for HttpIdentityClient {
    async fn get_user(
        &self,
        user_id: &str,
        auth: Option<&str>,
    ) -> std::result::Result<UserRecord, IdentityError> {
        self.get_json(&format!("api/user/{user_id}/"), auth, "get_user")
            .await
    }

    async fn list_admins(
        &self,
        auth: Option<&str>,
    ) -> std::result::Result<Vec<UserRecord>, IdentityError> {
        let users: Vec<UserRecord> = self.get_json("api/user/list/", auth, "list_admins").await?;

        // Admin filtering is client-side; the user service has no role filter.
        Ok(users
            .into_iter()
            .filter(|u| u.is_admin() && u.email_nonempty().is_some())
            .collect())
    }

    async fn get_current_user(
        &self,
        auth: Option<&str>,
    ) -> std::result::Result<UserRecord, IdentityError> {
        if auth.is_none() {
            return Err(IdentityError::MissingAuth);
        }
        self.get_json("api/user/current-user/", auth, "get_current_user")
            .await
    }
}
