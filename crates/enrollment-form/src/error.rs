//! Application error types.

use crate::backend::{BackendError, UniqueField};
use crate::validation::FieldErrors;
use thiserror::Error;

const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Why verification could not produce a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    InvalidOrExpiredCode,
    RateLimited,
    MissingSession,
}

/// Errors surfaced by form actions.
#[derive(Error, Debug)]
pub enum FormError {
    /// Shown inline next to each field, never as a toast.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Already enrolled ({0:?})")]
    Duplicate(Option<UniqueField>),

    #[error("Authentication failed: {0:?}")]
    Auth(AuthFailure),

    #[error("Remote error: {}", message.as_deref().unwrap_or("unknown"))]
    Remote { message: Option<String> },
}

impl FormError {
    /// Message shown to the user for this error.
    pub fn user_message(&self, course: &str) -> String {
        match self {
            FormError::Validation(errors) => errors
                .fields()
                .first()
                .and_then(|field| errors.get(*field))
                .unwrap_or(GENERIC_FAILURE)
                .to_string(),
            FormError::Duplicate(Some(UniqueField::Email)) => {
                format!("This email is already enrolled in the {} course.", course)
            }
            FormError::Duplicate(Some(UniqueField::FullName)) => {
                "This name is already registered for the course.".into()
            }
            FormError::Duplicate(None) => {
                format!("You are already enrolled in the {} course.", course)
            }
            FormError::Auth(AuthFailure::InvalidOrExpiredCode) => {
                "Invalid or expired code. Please try again.".into()
            }
            FormError::Auth(AuthFailure::RateLimited) => {
                "Too many attempts. Wait a few minutes.".into()
            }
            FormError::Auth(AuthFailure::MissingSession) => {
                "Verification failed. Please try again.".into()
            }
            FormError::Remote { message } => message
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or(GENERIC_FAILURE)
                .to_string(),
        }
    }
}

impl From<BackendError> for FormError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::UniqueViolation(field) => FormError::Duplicate(field),
            BackendError::InvalidCode => FormError::Auth(AuthFailure::InvalidOrExpiredCode),
            BackendError::RateLimited => FormError::Auth(AuthFailure::RateLimited),
            BackendError::Other(message) => FormError::Remote {
                message: Some(message),
            },
        }
    }
}

/// Result type alias for form actions.
pub type FormResult<T> = Result<T, FormError>;
