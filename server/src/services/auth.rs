//! Registration, login, and session token refresh.
//!
//! ARCHITECTURE
//! ============
//! `AuthService` validates input, then delegates to the password hasher, the
//! user store, and the token issuer. It holds no mutable state, so a single
//! instance is shared by every request behind an `Arc`.
//!
//! Input validation always runs before any hashing or token work. bcrypt runs
//! on the blocking pool so a slow hash never stalls the async workers.

use std::sync::Arc;

use super::password::{MAX_PASSWORD_BYTES, PasswordError, PasswordHasher};
use super::token::{Claims, IssuedToken, TokenIssuer};
use super::users::{NewUser, Role, StoreError, User, UserStore};

pub const CREDENTIALS_REQUIRED: &str = "email and password are required";
pub const INVALID_EMAIL: &str = "invalid email address";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("missing or invalid session token")]
    Unauthenticated,
    #[error("password hashing failed: {0}")]
    Password(#[from] PasswordError),
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error("user store error: {0}")]
    Store(StoreError),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => Self::DuplicateEmail,
            other => Self::Store(other),
        }
    }
}

/// A freshly issued token together with the user it was issued for.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: IssuedToken,
    pub user: User,
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

/// Check a credential pair and return the normalized email.
///
/// # Errors
///
/// Returns `AuthError::Validation` if either field is empty, the email is
/// malformed, or the password exceeds what bcrypt can hash.
pub fn validate_credentials(email: &str, password: &str) -> Result<String, AuthError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::Validation(CREDENTIALS_REQUIRED.into()));
    }
    let email = normalize_email(email).ok_or_else(|| AuthError::Validation(INVALID_EMAIL.into()))?;
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::Validation(format!("password must be at most {MAX_PASSWORD_BYTES} bytes")));
    }
    Ok(email)
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    /// Verified against on unknown-email logins so both paths pay the same bcrypt cost.
    dummy_digest: Option<String>,
}

impl AuthService {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        let dummy_digest = match hasher.hash("portal-dummy-password") {
            Ok(digest) => Some(digest),
            Err(e) => {
                tracing::warn!(error = %e, "failed to prepare dummy digest");
                None
            }
        };
        Self { users, hasher, tokens, dummy_digest }
    }

    /// Create a user with the default role.
    ///
    /// # Errors
    ///
    /// `Validation` for bad input, `DuplicateEmail` if the email is taken,
    /// and internal variants for hashing or storage failures.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = validate_credentials(email, password)?;
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let hasher = self.hasher;
        let plaintext = password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&plaintext)).await??;

        let user = self.users.insert(NewUser { email, role: Role::User, password_hash }).await?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Verify credentials and issue a session token.
    ///
    /// # Errors
    ///
    /// `Validation` for bad input, `InvalidCredentials` for an unknown email
    /// or wrong password.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = validate_credentials(email, password)?;
        let Some(user) = self.users.find_by_email(&email).await? else {
            tracing::debug!("login for unknown email");
            if let Some(digest) = self.dummy_digest.clone() {
                self.verify_blocking(password, digest).await?;
            }
            return Err(AuthError::InvalidCredentials);
        };

        let matches = self.verify_blocking(password, user.password_hash.clone()).await?;
        if !matches {
            tracing::debug!(user_id = %user.id, "login password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue(&user)?;
        tracing::info!(user_id = %user.id, "login succeeded");
        Ok(Session { token, user })
    }

    /// Decode a bearer token into its claims.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` for an invalid or expired token.
    pub fn authenticate(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens.decode(token).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            AuthError::Unauthenticated
        })
    }

    /// Reissue a token for an already-authenticated caller. The role comes
    /// from the stored user, not the old claims.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` if the user no longer exists.
    pub async fn refresh(&self, claims: &Claims) -> Result<Session, AuthError> {
        let user = self.current_user(claims).await?;
        let token = self.issue(&user)?;
        tracing::debug!(user_id = %user.id, "session token refreshed");
        Ok(Session { token, user })
    }

    /// Load the user a token was issued for.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` if the user no longer exists.
    pub async fn current_user(&self, claims: &Claims) -> Result<User, AuthError> {
        self.users.find_by_id(claims.sub).await?.ok_or(AuthError::Unauthenticated)
    }

    async fn verify_blocking(&self, password: &str, digest: String) -> Result<bool, AuthError> {
        let hasher = self.hasher;
        let plaintext = password.to_owned();
        Ok(tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &digest)).await?)
    }

    fn issue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        self.tokens
            .issue(user.id, user.role)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
