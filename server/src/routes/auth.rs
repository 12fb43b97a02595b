//! Auth routes: liveness probe, registration, login, token refresh.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRef, FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use serde::{Deserialize, Serialize};

use crate::services::auth::{AuthError, Session};
use crate::services::token::Claims;
use crate::services::users::PublicUser;
use crate::state::AppState;

pub const PING_BODY: &str = "auth service alive";
pub const INVALID_BODY: &str = "invalid request body";
pub const REGISTERED: &str = "user registered successfully";
pub const LOGGED_IN: &str = "login successful";
pub const REFRESHED: &str = "token refreshed";

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Body of `POST /auth/register` and `POST /auth/login`. Missing fields
/// decode as empty strings and fail validation.
#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: &'static str,
    pub token: String,
    /// Unix seconds.
    pub expires_at: i64,
    pub user: PublicUser,
}

impl SessionResponse {
    fn new(message: &'static str, session: Session) -> Self {
        Self {
            message,
            token: session.token.token,
            expires_at: session.token.expires_at,
            user: PublicUser::from(&session.user),
        }
    }
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

pub(crate) fn auth_error_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Validation(_) => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
        AuthError::DuplicateEmail => StatusCode::CONFLICT,
        AuthError::Password(_) | AuthError::Signing(_) | AuthError::Store(_) | AuthError::Task(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = auth_error_status(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "auth request failed");
            return error_response(status, "internal server error");
        }
        error_response(status, &self.to_string())
    }
}

fn decode_body(body: Result<Json<AuthRequest>, JsonRejection>) -> Result<AuthRequest, Response> {
    body.map(|Json(req)| req).map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected auth request body");
        error_response(StatusCode::BAD_REQUEST, INVALID_BODY)
    })
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Caller authenticated by an `Authorization: Bearer <token>` header.
/// Use as a handler parameter to require a valid session token.
pub struct AuthUser {
    pub claims: Claims,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthError::Unauthenticated)?;

        let app_state = AppState::from_ref(state);
        let claims = app_state.auth.authenticate(bearer.token())?;
        Ok(Self { claims })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /auth/ping`: unconditional liveness probe.
pub async fn ping() -> &'static str {
    PING_BODY
}

/// `POST /auth/register`: validate, hash and persist the new user.
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<impl IntoResponse, Response> {
    let req = decode_body(body)?;
    state
        .auth
        .register(&req.email, &req.password)
        .await
        .map_err(IntoResponse::into_response)?;
    Ok((StatusCode::CREATED, Json(MessageResponse { message: REGISTERED })))
}

/// `POST /auth/login`: verify credentials, return a session token.
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<Json<SessionResponse>, Response> {
    let req = decode_body(body)?;
    let session = state
        .auth
        .login(&req.email, &req.password)
        .await
        .map_err(IntoResponse::into_response)?;
    Ok(Json(SessionResponse::new(LOGGED_IN, session)))
}

/// `POST /auth/refresh`: exchange a valid token for a fresh one.
pub async fn refresh(State(state): State<AppState>, auth: AuthUser) -> Result<Json<SessionResponse>, AuthError> {
    let session = state.auth.refresh(&auth.claims).await?;
    Ok(Json(SessionResponse::new(REFRESHED, session)))
}

/// `GET /auth/me`: return the token holder.
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<PublicUser>, AuthError> {
    let user = state.auth.current_user(&auth.claims).await?;
    Ok(Json(PublicUser::from(&user)))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
