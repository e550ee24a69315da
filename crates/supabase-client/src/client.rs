//! Supabase HTTP client.

use crate::error::SupabaseError;
use crate::types::*;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use urlencoding::encode;

/// PostgreSQL `unique_violation`.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// Auth error codes meaning the submitted one-time code is wrong or stale.
const OTP_REJECTED_CODES: &[&str] = &["otp_expired", "invalid_credentials"];

/// Supabase client covering email OTP auth and table access.
///
/// The anon key is stored using `SecretString` to prevent accidental
/// exposure in logs or debug output. The session lives in memory only
/// and is shared between clones.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: SecretString,
    session: Arc<RwLock<Option<Session>>>,
}

impl SupabaseClient {
    /// Create a new Supabase client.
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SupabaseError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: SecretString::new(anon_key.into()),
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// Seed the client with an already issued session.
    pub fn with_session(self, session: Session) -> Self {
        Self {
            session: Arc::new(RwLock::new(Some(session))),
            ..self
        }
    }

    /// Get the configured project URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current in-memory session, if one has been issued.
    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Email a one-time code, creating the user if needed.
    #[instrument(skip(self, metadata))]
    pub async fn sign_in_with_otp(
        &self,
        email: &str,
        metadata: Option<Value>,
    ) -> Result<(), SupabaseError> {
        let request = OtpRequest {
            email: email.to_string(),
            create_user: true,
            data: metadata,
        };

        let response = self
            .auth_request(self.client.post(format!("{}/auth/v1/otp", self.base_url)))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.extract_error(response).await);
        }

        debug!("One-time code issued");
        Ok(())
    }

    /// Exchange an emailed code for a session. The session is kept in memory.
    #[instrument(skip(self, token))]
    pub async fn verify_otp(&self, email: &str, token: &str) -> Result<Session, SupabaseError> {
        let request = VerifyRequest {
            kind: "email".into(),
            email: email.to_string(),
            token: token.to_string(),
        };

        let response = self
            .auth_request(self.client.post(format!("{}/auth/v1/verify", self.base_url)))
            .json(&request)
            .send()
            .await?;

        let session: Session = self.handle_response(response).await?;
        *self.session.write().await = Some(session.clone());

        Ok(session)
    }

    /// Fetch the first row matching all filters.
    #[instrument(skip(self, filters), fields(filter_count = filters.len()))]
    pub async fn select_first<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter],
    ) -> Result<Option<T>, SupabaseError> {
        let mut query: Vec<(String, String)> = vec![("select".into(), "*".into())];
        query.extend(filters.iter().map(Filter::to_query_pair));
        query.push(("limit".into(), "1".into()));

        let request = self
            .client
            .get(format!("{}/rest/v1/{}", self.base_url, encode(table)))
            .query(&query);

        let response = self.rest_request(request).await.send().await?;
        let rows: Vec<T> = self.handle_response(response).await?;

        Ok(rows.into_iter().next())
    }

    /// Insert a row and return it as stored.
    #[instrument(skip(self, row))]
    pub async fn insert<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<R, SupabaseError> {
        let request = self
            .client
            .post(format!("{}/rest/v1/{}", self.base_url, encode(table)))
            .header("Prefer", "return=representation")
            .json(row);

        let response = self.rest_request(request).await.send().await?;
        let rows: Vec<R> = self.handle_response(response).await?;

        rows.into_iter().next().ok_or(SupabaseError::EmptyResponse)
    }

    /// Health check - returns true if the auth service is reachable.
    pub async fn health_check(&self) -> bool {
        self.auth_request(self.client.get(format!("{}/auth/v1/health", self.base_url)))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", self.anon_key.expose_secret())
            .header("Content-Type", "application/json")
    }

    /// REST calls run as the signed-in user when a session exists.
    async fn rest_request(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.anon_key.expose_secret().to_string(),
        };

        self.auth_request(request)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    /// Handle HTTP response, converting errors appropriately.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, SupabaseError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            debug!("Response body: {}", preview(&body, 200));
            serde_json::from_str(&body).map_err(SupabaseError::from)
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Extract error information from failed response.
    async fn extract_error(&self, response: reqwest::Response) -> SupabaseError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();

        classify_error(status, body, text)
    }
}

/// First `max_chars` characters of a body, for logging.
fn preview(body: &str, max_chars: usize) -> &str {
    body.char_indices()
        .nth(max_chars)
        .map_or(body, |(i, _)| &body[..i])
}

/// Map a failed response onto a structured error kind.
fn classify_error(status: StatusCode, body: ErrorBody, raw: String) -> SupabaseError {
    let error_code = body.error_code.as_deref().unwrap_or_default();

    if status == StatusCode::TOO_MANY_REQUESTS || error_code.starts_with("over_") {
        warn!("Rate limit exceeded");
        return SupabaseError::RateLimit;
    }

    let message = body.text().map(str::to_string).unwrap_or(raw);

    if body.pg_code() == Some(PG_UNIQUE_VIOLATION) {
        return SupabaseError::UniqueViolation {
            column: body.details.as_deref().and_then(conflicting_column),
            message,
        };
    }

    if OTP_REJECTED_CODES.contains(&error_code) {
        return SupabaseError::OtpRejected { message };
    }

    let code = body
        .error_code
        .clone()
        .or_else(|| body.pg_code().map(str::to_string));

    SupabaseError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}

/// Column named in PostgreSQL constraint details: `Key (email)=(x) already exists.`
fn conflicting_column(details: &str) -> Option<String> {
    let rest = details.trim().strip_prefix("Key (")?;
    let end = rest.find(')')?;
    let column = rest[..end].trim();

    if column.is_empty() {
        None
    } else {
        Some(column.to_string())
    }
}
