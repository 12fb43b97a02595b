//! Shared wire DTOs for the client/server boundary.
//!
//! DESIGN
//! ======
//! These types mirror the server's auth payloads. `User` is also what the
//! session store persists, so its serde shape is part of the storage format.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated user as returned by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Role name, e.g. `"user"` or `"admin"`.
    pub role: String,
}

/// Body of `POST /auth/register` and `POST /auth/login`.
#[derive(Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Successful login or refresh.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SessionResponse {
    pub message: String,
    pub token: String,
    /// Unix seconds.
    pub expires_at: i64,
    pub user: User,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
