//! Supabase client errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupabaseError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("One-time code rejected: {message}")]
    OtpRejected { message: String },

    #[error("Unique constraint violated: {message}")]
    UniqueViolation {
        /// Column named in the constraint details, if reported
        column: Option<String>,
        message: String,
    },

    #[error("API error: {status} - {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Empty response from Supabase")]
    EmptyResponse,
}
