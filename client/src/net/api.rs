//! REST API client for the auth service.
//!
//! Every authenticated call takes its `Credential` explicitly. There is no
//! process-wide default token to mutate; callers thread the credential from
//! the session store to each request.
//!
//! ERROR HANDLING
//! ==============
//! Non-2xx responses become `ApiError::Status` carrying the server's `error`
//! message when the body has one, so callers can branch on 401 without
//! string matching.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::fmt;
use std::time::Duration;

use super::types::{Credentials, ErrorResponse, MessageResponse, SessionResponse, User};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bearer credential for outbound calls. `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
}

impl ApiError {
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }
}

/// The one call the session store needs from the server.
#[async_trait::async_trait]
pub trait SessionApi: Send + Sync {
    /// Exchange a still-valid credential for a fresh session.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status { status: 401, .. }` if the server rejects the credential.
    async fn refresh(&self, credential: &Credential) -> Result<SessionResponse, ApiError>;
}

pub(crate) fn normalize_base_url(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = reqwest::Url::parse(trimmed).map_err(|e| ApiError::InvalidBaseUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
        return Err(ApiError::InvalidBaseUrl(raw.to_owned()));
    }
    Ok(trimmed.to_owned())
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{base_url}{path}")
}

pub(crate) fn error_message(status: u16, body: &str) -> String {
    if let Ok(err) = serde_json::from_str::<ErrorResponse>(body) {
        return err.error;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() { format!("request failed: {status}") } else { trimmed.to_owned() }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Status { status: status.as_u16(), message: error_message(status.as_u16(), &body) })
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for `base_url` (e.g. `http://127.0.0.1:8080`).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not http(s) or the HTTP client fails to build.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(base_url)?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /auth/ping`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx status.
    pub async fn ping(&self) -> Result<String, ApiError> {
        let resp = self.http.get(endpoint(&self.base_url, "/auth/ping")).send().await?;
        Ok(check(resp).await?.text().await?)
    }

    /// `POST /auth/register`. Returns the server's confirmation message.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 400 for invalid input and 409 for a taken email.
    pub async fn register(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let resp = self
            .http
            .post(endpoint(&self.base_url, "/auth/register"))
            .json(&Credentials { email, password })
            .send()
            .await?;
        let body: MessageResponse = check(resp).await?.json().await?;
        Ok(body.message)
    }

    /// `POST /auth/login`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 401 for bad credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionResponse, ApiError> {
        let resp = self
            .http
            .post(endpoint(&self.base_url, "/auth/login"))
            .json(&Credentials { email, password })
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// `POST /auth/refresh`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 401 if the credential is expired or invalid.
    pub async fn refresh_token(&self, credential: &Credential) -> Result<SessionResponse, ApiError> {
        let resp = self
            .http
            .post(endpoint(&self.base_url, "/auth/refresh"))
            .bearer_auth(credential.token())
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// `GET /auth/me`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 401 if the credential is expired or invalid.
    pub async fn me(&self, credential: &Credential) -> Result<User, ApiError> {
        let resp = self
            .http
            .get(endpoint(&self.base_url, "/auth/me"))
            .bearer_auth(credential.token())
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }
}

#[async_trait::async_trait]
impl SessionApi for ApiClient {
    async fn refresh(&self, credential: &Credential) -> Result<SessionResponse, ApiError> {
        self.refresh_token(credential).await
    }
}
