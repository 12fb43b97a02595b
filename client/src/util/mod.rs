//! Utility helpers shared across client modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! Utility modules isolate environment concerns (here, where persisted
//! records live) from session logic to improve reuse and testability.

pub mod storage;
