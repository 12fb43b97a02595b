//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the auth endpoints and the health probe under a single
//! Axum router, wrapped in request tracing, CORS, and a per-request timeout.

pub mod auth;

use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use time::OffsetDateTime;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::CorsOrigins;
use crate::state::AppState;

pub const SERVICE_NAME: &str = "project-portal-auth";

/// Full application router.
pub fn app(state: AppState, cors: &CorsOrigins, request_timeout: Duration) -> Router {
    Router::new()
        .route("/auth/ping", get(auth::ping))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/me", get(auth::me))
        .route("/health", get(health))
        .layer(timeout_layer(request_timeout))
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Requests running past `request_timeout` are answered with 408.
pub(crate) fn timeout_layer(request_timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout)
}

pub(crate) fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    match origins {
        CorsOrigins::Any => layer.allow_origin(Any),
        CorsOrigins::List(list) => {
            let values = list.iter().filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "ignoring unparseable CORS origin");
                    None
                }
            });
            // Credentials are only allowed with an explicit origin list.
            layer.allow_origin(AllowOrigin::list(values)).allow_credentials(true)
        }
    }
}

/// `GET /health`: report whether the user store is reachable.
async fn health(State(state): State<AppState>) -> Response {
    match state.users.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "database": "connected",
                "timestamp": OffsetDateTime::now_utc().unix_timestamp(),
                "service": SERVICE_NAME,
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "database": "disconnected",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
