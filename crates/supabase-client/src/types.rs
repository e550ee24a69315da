//! Supabase API types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Authenticated session returned by the verify endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
}

/// Authenticated user attached to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

fn default_token_type() -> String {
    "bearer".into()
}

/// Body of `POST /auth/v1/otp`.
#[derive(Debug, Clone, Serialize)]
pub struct OtpRequest {
    pub email: String,
    pub create_user: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Body of `POST /auth/v1/verify`.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub email: String,
    pub token: String,
}

/// Row filter for PostgREST queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Exact match
    Eq(String, String),
    /// Case-insensitive pattern match
    ILike(String, String),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Eq(column.into(), value.into())
    }

    pub fn ilike(column: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::ILike(column.into(), value.into())
    }

    /// Render as a PostgREST query pair, e.g. `("email", "eq.jane@example.com")`.
    pub fn to_query_pair(&self) -> (String, String) {
        match self {
            Filter::Eq(column, value) => (column.clone(), format!("eq.{}", value)),
            Filter::ILike(column, value) => (column.clone(), format!("ilike.{}", value)),
        }
    }
}

/// Error body shared by the auth and REST endpoints.
///
/// Auth errors carry `error_code`/`msg` (older servers use `error`/`error_description`),
/// PostgREST errors carry a PostgreSQL `code` with `message`/`details`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl ErrorBody {
    /// PostgreSQL error code, when the body came from PostgREST.
    pub fn pg_code(&self) -> Option<&str> {
        self.code.as_ref().and_then(Value::as_str)
    }

    /// Best human-readable message in the body.
    pub fn text(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error_description.as_deref())
            .or(self.error.as_deref())
            .filter(|m| !m.is_empty())
    }
}
