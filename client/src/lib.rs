//! Client library for the project portal auth service.
//!
//! SYSTEM CONTEXT
//! ==============
//! `net` talks to the server, `util::storage` persists small JSON records
//! across restarts, and `state::session` ties both together into the
//! persisted session that a client process rehydrates on startup.

pub mod net;
pub mod state;
pub mod util;
