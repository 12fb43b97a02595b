//! Persisted auth session for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session store is the single owner of the bearer token on the client.
//! Callers read a `Credential` from it and pass that to `ApiClient` calls;
//! nothing else caches the token.
//!
//! DESIGN
//! ======
//! - `is_authenticated` is derived: every mutation recomputes it from
//!   `token.is_some()`, including rehydration from storage.
//! - Every mutation persists `{token, user, isAuthenticated}` under
//!   `SESSION_STORE_KEY` while the state lock is held, so the stored blob
//!   never lags the in-memory state.
//! - Refreshes are serialized by an async gate. A refresh result is only
//!   applied if the token it was issued for is still the current one.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::net::api::{ApiError, Credential, SessionApi};
use crate::net::types::{SessionResponse, User};
use crate::util::storage::{Storage, load_json, save_json};

pub const SESSION_STORE_KEY: &str = "auth-storage";

/// Routes where a refresh must not run on startup.
pub const AUTH_SCREENS: &[&str] = &["/login", "/register"];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub token: Option<String>,
    pub user: Option<User>,
    pub is_authenticated: bool,
    /// Set once persisted state has been loaded.
    pub hydrated: bool,
}

impl SessionState {
    fn sync_authenticated(&mut self) {
        self.is_authenticated = self.token.is_some();
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSession {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    is_authenticated: bool,
}

impl From<&SessionState> for PersistedSession {
    fn from(state: &SessionState) -> Self {
        Self { token: state.token.clone(), user: state.user.clone(), is_authenticated: state.is_authenticated }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New token and user installed.
    Refreshed,
    /// Server rejected the credential; the session was cleared.
    SignedOut,
    /// No token to refresh.
    NoSession,
    /// The session changed while the request was in flight; result dropped.
    Superseded,
}

#[derive(Debug)]
pub enum RefreshStatus {
    Skipped,
    Ran(RefreshOutcome),
    Failed(ApiError),
}

#[derive(Debug)]
pub struct BootstrapOutcome {
    /// Credential in effect once bootstrap finishes.
    pub credential: Option<Credential>,
    pub refresh: RefreshStatus,
}

pub struct SessionStore {
    storage: Arc<dyn Storage>,
    state: Mutex<SessionState>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl SessionStore {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage, state: Mutex::new(SessionState::default()), refresh_gate: tokio::sync::Mutex::new(()) }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &SessionState) {
        if let Err(e) = save_json(self.storage.as_ref(), SESSION_STORE_KEY, &PersistedSession::from(state)) {
            tracing::warn!(error = %e, "failed to persist session");
        }
    }

    fn mutate(&self, f: impl FnOnce(&mut SessionState)) {
        let mut state = self.lock();
        f(&mut state);
        state.sync_authenticated();
        self.persist(&state);
    }

    /// Apply `f` only if the current token still matches `expected`.
    fn mutate_if_current(&self, expected: &Credential, f: impl FnOnce(&mut SessionState)) -> bool {
        let mut state = self.lock();
        if state.token.as_deref() != Some(expected.token()) {
            return false;
        }
        f(&mut state);
        state.sync_authenticated();
        self.persist(&state);
        true
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        self.lock().token.clone().map(Credential::bearer)
    }

    pub fn set_token(&self, token: Option<String>) {
        self.mutate(|state| state.token = token);
    }

    pub fn set_user(&self, user: Option<User>) {
        self.mutate(|state| state.user = user);
    }

    pub fn set_session(&self, token: String, user: User) {
        self.mutate(|state| {
            state.token = Some(token);
            state.user = Some(user);
        });
    }

    /// Install the result of a login or refresh.
    pub fn apply_session(&self, session: SessionResponse) {
        self.set_session(session.token, session.user);
    }

    /// Logout.
    pub fn clear(&self) {
        self.mutate(|state| {
            state.token = None;
            state.user = None;
        });
    }

    pub fn set_hydrated(&self, hydrated: bool) {
        self.mutate(|state| state.hydrated = hydrated);
    }

    /// Load the persisted session and mark the store hydrated. The blob is
    /// written back so a stale `isAuthenticated` on disk is corrected.
    pub fn rehydrate(&self) -> Option<Credential> {
        let persisted: PersistedSession = load_json(self.storage.as_ref(), SESSION_STORE_KEY).unwrap_or_default();
        self.mutate(|state| {
            state.token = persisted.token;
            state.user = persisted.user;
            state.hydrated = true;
        });
        self.credential()
    }

    /// Exchange the current token for a fresh one.
    ///
    /// # Errors
    ///
    /// Returns the API error for any failure other than a 401, which signs
    /// the session out instead. The session is left untouched on error.
    pub async fn refresh(&self, api: &dyn SessionApi) -> Result<RefreshOutcome, ApiError> {
        let _gate = self.refresh_gate.lock().await;
        let Some(credential) = self.credential() else {
            return Ok(RefreshOutcome::NoSession);
        };

        match api.refresh(&credential).await {
            Ok(session) => {
                let applied = self.mutate_if_current(&credential, |state| {
                    state.token = Some(session.token);
                    state.user = Some(session.user);
                });
                Ok(if applied { RefreshOutcome::Refreshed } else { RefreshOutcome::Superseded })
            }
            Err(e) if e.is_unauthorized() => {
                let cleared = self.mutate_if_current(&credential, |state| {
                    state.token = None;
                    state.user = None;
                });
                if cleared {
                    tracing::info!("session rejected by server; signed out");
                    Ok(RefreshOutcome::SignedOut)
                } else {
                    Ok(RefreshOutcome::Superseded)
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "session refresh failed");
                Err(e)
            }
        }
    }

    /// Rehydrate, then refresh at most once unless `current_path` is an
    /// auth screen.
    pub async fn bootstrap(&self, api: &dyn SessionApi, current_path: &str) -> BootstrapOutcome {
        let recovered = self.rehydrate();
        let refresh = if recovered.is_none() || is_auth_screen(current_path) {
            RefreshStatus::Skipped
        } else {
            match self.refresh(api).await {
                Ok(outcome) => RefreshStatus::Ran(outcome),
                Err(e) => RefreshStatus::Failed(e),
            }
        };
        BootstrapOutcome { credential: self.credential(), refresh }
    }
}

/// True for `/login`, `/register`, and paths beneath them. Query strings,
/// fragments, and trailing slashes are ignored.
#[must_use]
pub fn is_auth_screen(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_end_matches('/');
    AUTH_SCREENS
        .iter()
        .any(|screen| path == *screen || path.strip_prefix(screen).is_some_and(|rest| rest.starts_with('/')))
}
