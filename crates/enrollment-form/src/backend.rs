//! Remote auth and storage collaborator.
//!
//! The controller only talks to [`EnrollmentBackend`]; failures come back as a
//! structured [`BackendError`] so nothing downstream inspects message text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use supabase_client::{Filter, SupabaseClient, SupabaseError};
use thiserror::Error;
use tracing::debug;

/// A persisted course enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Fields written when creating a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRegistration {
    pub full_name: String,
    pub email: String,
}

/// Profile data attached to the user when a code is first requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub full_name: String,
}

/// Credential issued after a code is verified. Opaque to the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub email: Option<String>,
}

impl Session {
    pub fn is_usable(&self) -> bool {
        !self.access_token.is_empty()
    }
}

/// Lookup used by the duplicate pre-checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupField {
    /// Exact match on the email column
    Email,
    /// Case-insensitive match on the name column
    FullName,
}

/// Column whose uniqueness constraint rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    FullName,
}

impl UniqueField {
    pub fn from_column(column: &str) -> Option<Self> {
        match column {
            "email" => Some(UniqueField::Email),
            "full_name" => Some(UniqueField::FullName),
            _ => None,
        }
    }
}

/// Structured failure kinds reported by the collaborator.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Unique constraint violated ({0:?})")]
    UniqueViolation(Option<UniqueField>),

    #[error("Verification code is invalid or has expired")]
    InvalidCode,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("{0}")]
    Other(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Operations the enrollment form needs from the remote service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentBackend: Send + Sync {
    /// Whether any registration matches `value` on `field`.
    async fn exists(&self, field: LookupField, value: &str) -> BackendResult<bool>;

    /// Email a one-time code. `profile` is attached on the first request only.
    async fn request_code(&self, email: &str, profile: Option<Profile>) -> BackendResult<()>;

    /// Exchange a code for a session.
    async fn verify_code(&self, email: &str, code: &str) -> BackendResult<Session>;

    async fn get_record(&self, email: &str) -> BackendResult<Option<Registration>>;

    async fn insert_record(&self, fields: NewRegistration) -> BackendResult<Registration>;

    /// Session left over from an earlier verification, if any.
    async fn current_session(&self) -> BackendResult<Option<Session>>;
}

/// [`EnrollmentBackend`] backed by a Supabase project.
#[derive(Clone)]
pub struct SupabaseBackend {
    client: SupabaseClient,
    table: String,
}

impl SupabaseBackend {
    pub fn new(client: SupabaseClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

impl From<SupabaseError> for BackendError {
    fn from(e: SupabaseError) -> Self {
        match e {
            SupabaseError::UniqueViolation { column, .. } => {
                BackendError::UniqueViolation(column.as_deref().and_then(UniqueField::from_column))
            }
            SupabaseError::OtpRejected { .. } => BackendError::InvalidCode,
            SupabaseError::RateLimit => BackendError::RateLimited,
            SupabaseError::Api { message, .. } => BackendError::Other(message),
            other => BackendError::Other(other.to_string()),
        }
    }
}

fn into_session(session: supabase_client::Session) -> Session {
    Session {
        access_token: session.access_token,
        email: session.user.email,
    }
}

#[async_trait]
impl EnrollmentBackend for SupabaseBackend {
    async fn exists(&self, field: LookupField, value: &str) -> BackendResult<bool> {
        let filter = match field {
            LookupField::Email => Filter::eq("email", value),
            LookupField::FullName => Filter::ilike("full_name", value),
        };

        let row: Option<serde_json::Value> =
            self.client.select_first(&self.table, &[filter]).await?;
        debug!("Lookup on {:?} found={}", field, row.is_some());

        Ok(row.is_some())
    }

    async fn request_code(&self, email: &str, profile: Option<Profile>) -> BackendResult<()> {
        let metadata = profile.map(serde_json::to_value).transpose().map_err(|e| {
            BackendError::Other(format!("Failed to encode profile: {}", e))
        })?;

        self.client.sign_in_with_otp(email, metadata).await?;
        Ok(())
    }

    async fn verify_code(&self, email: &str, code: &str) -> BackendResult<Session> {
        let session = self.client.verify_otp(email, code).await?;
        Ok(into_session(session))
    }

    async fn get_record(&self, email: &str) -> BackendResult<Option<Registration>> {
        let record = self
            .client
            .select_first(&self.table, &[Filter::eq("email", email)])
            .await?;
        Ok(record)
    }

    async fn insert_record(&self, fields: NewRegistration) -> BackendResult<Registration> {
        let record = self.client.insert(&self.table, &fields).await?;
        Ok(record)
    }

    async fn current_session(&self) -> BackendResult<Option<Session>> {
        Ok(self.client.session().await.map(into_session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_field_from_column() {
        assert_eq!(UniqueField::from_column("email"), Some(UniqueField::Email));
        assert_eq!(UniqueField::from_column("full_name"), Some(UniqueField::FullName));
        assert_eq!(UniqueField::from_column("id"), None);
    }

    #[test]
    fn test_supabase_error_mapping() {
        let err: BackendError = SupabaseError::UniqueViolation {
            column: Some("full_name".into()),
            message: "duplicate key".into(),
        }
        .into();
        assert!(matches!(err, BackendError::UniqueViolation(Some(UniqueField::FullName))));

        let err: BackendError = SupabaseError::OtpRejected {
            message: "Token has expired or is invalid".into(),
        }
        .into();
        assert!(matches!(err, BackendError::InvalidCode));

        let err: BackendError = SupabaseError::RateLimit.into();
        assert!(matches!(err, BackendError::RateLimited));

        let err: BackendError = SupabaseError::Api {
            status: 500,
            code: None,
            message: "boom".into(),
        }
        .into();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_session_usable() {
        let session = Session {
            access_token: String::new(),
            email: None,
        };
        assert!(!session.is_usable());
    }
}
