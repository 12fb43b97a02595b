//! Client-side state containers.

pub mod session;
