//! Networking modules for the auth REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` performs HTTP calls and `types` defines the shared wire schema.

pub mod api;
pub mod types;
