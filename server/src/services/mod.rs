//! Domain services used by HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own validation, hashing, token, and persistence concerns
//! so route handlers can stay focused on protocol translation.

pub mod auth;
pub mod password;
pub mod token;
pub mod users;
