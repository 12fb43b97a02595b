//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the auth service and the user store it was built on; the store is
//! also kept directly so the health probe can ping it. Requests share no
//! mutable state beyond what the store guards internally.

use std::sync::Arc;

use crate::services::auth::AuthService;
use crate::services::password::PasswordHasher;
use crate::services::token::TokenIssuer;
use crate::services::users::UserStore;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        let auth = Arc::new(AuthService::new(users.clone(), hasher, tokens));
        Self { auth, users }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
