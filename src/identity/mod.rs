//! # User Identity Collaborator
//!
//! Single interface over the external user service. All lookups carry an
//! explicit timeout and return a typed result; no transport error crosses
//! this boundary as a panic or an untyped exception. Callers in the
//! notification path degrade on failure instead of aborting.

pub mod client;

pub use client::HttpIdentityClient;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Role string the user service uses for administrators
pub const ADMIN_ROLE: &str = "ADMIN";
/// Role string the user service uses for regular users
pub const REGULAR_ROLE: &str = "USER";

/// User record as returned by the user service
///
/// The wire field for the display name is `nom`; ids may arrive as JSON
/// numbers or strings depending on the service version, so both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(rename = "nom", default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl UserRecord {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }

    pub fn is_regular(&self) -> bool {
        self.role.as_deref() == Some(REGULAR_ROLE)
    }

    /// Email address, treating the empty string as absent
    pub fn email_nonempty(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(i64),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

/// Errors crossing the identity interface boundary
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IdentityError {
    #[error("user service request failed: {0}")]
    Transport(String),
    #[error("user service returned status {status} for {operation}")]
    Status { operation: String, status: u16 },
    #[error("user service response could not be parsed: {0}")]
    InvalidResponse(String),
    #[error("missing Authorization header")]
    MissingAuth,
}

/// Consolidated interface to the external user service
///
/// Every method forwards the caller's Authorization header when available
/// and is bounded by the configured per-request timeout; a timeout surfaces
/// as [`IdentityError::Transport`] like any other failure.
#[async_trait]
pub trait UserIdentityService: Send + Sync + 'static {
    /// Resolve a single user by external id
    async fn get_user(&self, user_id: &str, auth: Option<&str>)
        -> Result<UserRecord, IdentityError>;

    /// List administrator accounts with a usable email address
    async fn list_admins(&self, auth: Option<&str>) -> Result<Vec<UserRecord>, IdentityError>;

    /// Resolve the caller from their Authorization header
    async fn get_current_user(&self, auth: Option<&str>) -> Result<UserRecord, IdentityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_record_wire_format() {
        let user: UserRecord = serde_json::from_str(
            r#"{"id": 42, "username": "amartin", "nom": "Alice Martin", "email": "alice@example.com", "role": "ADMIN"}"#,
        )
        .unwrap();

        assert_eq!(user.id, "42");
        assert_eq!(user.display_name.as_deref(), Some("Alice Martin"));
        assert!(user.is_admin());
        assert!(!user.is_regular());
    }

    #[test]
    fn test_user_record_string_id_and_missing_fields() {
        let user: UserRecord = serde_json::from_str(r#"{"id": "u-7"}"#).unwrap();

        assert_eq!(user.id, "u-7");
        assert_eq!(user.display_name, None);
        assert!(!user.is_admin());
        assert!(!user.is_regular());
    }

    #[test]
    fn test_empty_email_treated_as_absent() {
        let user: UserRecord =
            serde_json::from_str(r#"{"id": 1, "email": "", "role": "USER"}"#).unwrap();

        assert_eq!(user.email_nonempty(), None);
        assert!(user.is_regular());
    }
}
