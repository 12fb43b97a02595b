//! Password hashing and verification.
//!
//! bcrypt salts every digest and its cost factor sets how expensive each
//! guess is. Both operations are CPU-bound; async callers should run them on
//! the blocking pool.

pub use bcrypt::DEFAULT_COST;

pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

/// bcrypt only reads this many bytes of input.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password exceeds {MAX_PASSWORD_BYTES} bytes")]
    TooLong,
    #[error("bcrypt hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    #[must_use]
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    #[must_use]
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password into a self-describing bcrypt digest.
    ///
    /// # Errors
    ///
    /// Returns `TooLong` past `MAX_PASSWORD_BYTES`, otherwise an error if the
    /// cost is out of range or the OS RNG fails.
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::TooLong);
        }
        Ok(bcrypt::hash(plaintext, self.cost)?)
    }

    /// Check a plaintext against a stored digest. A malformed digest or an
    /// over-long plaintext is a mismatch, never an error.
    #[must_use]
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        // bcrypt would compare only the first 72 bytes.
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return false;
        }
        match bcrypt::verify(plaintext, digest) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(error = %e, "stored password digest is malformed");
                false
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

#[cfg(test)]
#[path = "password_test.rs"]
mod tests;
