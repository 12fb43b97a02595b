//! Session token issuance and verification.
//!
//! ARCHITECTURE
//! ============
//! Session tokens are HS256 JWTs carrying `{sub, role, iat, exp}`. Nothing is
//! recorded server-side: validity is the signature plus the expiry, checked
//! with zero leeway.
//!
//! Signing always uses the current secret. Verification also accepts any
//! previous secret, so the key can rotate without invalidating every live
//! token at once. Secrets are injected at startup and never appear in code.

use std::fmt;
use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::users::Role;

/// Symmetric signing key material. `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret(<{} bytes redacted>)", self.0.len())
    }
}

/// Claim set encoded into every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: Uuid,
    pub role: Role,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    /// Unix seconds.
    pub expires_at: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token signing failed: {0}")]
    Signing(String),
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    /// Current key first, then previous keys in rotation order.
    decoding: Vec<DecodingKey>,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(current: SigningSecret, previous: Vec<SigningSecret>, ttl: Duration) -> Self {
        let decoding = std::iter::once(&current)
            .chain(previous.iter())
            .map(|s| DecodingKey::from_secret(s.as_bytes()))
            .collect();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(current.as_bytes()),
            decoding,
            validation,
            ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        }
    }

    #[must_use]
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Mint a token for `user_id` valid for the configured TTL from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<IssuedToken, TokenError> {
        self.issue_at(user_id, role, OffsetDateTime::now_utc())
    }

    /// Mint a token as if issued at `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue_at(&self, user_id: Uuid, role: Role, issued_at: OffsetDateTime) -> Result<IssuedToken, TokenError> {
        let iat = issued_at.unix_timestamp();
        let exp = iat.saturating_add(self.ttl_secs);
        let claims = Claims { sub: user_id, role, iat, exp };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok(IssuedToken { token, expires_at: exp })
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` once `exp` has passed, and
    /// `TokenError::Invalid` for anything no configured key accepts.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut last = TokenError::Invalid("no verification keys configured".into());
        for key in &self.decoding {
            match jsonwebtoken::decode::<Claims>(token, key, &self.validation) {
                Ok(data) => return Ok(data.claims),
                Err(e) => match e.kind() {
                    ErrorKind::InvalidSignature => last = TokenError::Invalid(e.to_string()),
                    ErrorKind::ExpiredSignature => return Err(TokenError::Expired),
                    _ => return Err(TokenError::Invalid(e.to_string())),
                },
            }
        }
        Err(last)
    }
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("keys", &self.decoding.len())
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "token_test.rs"]
mod tests;
