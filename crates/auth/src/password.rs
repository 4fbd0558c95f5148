//! Password hashing port.
//!
//! The hashing primitive itself lives in infrastructure (Argon2). This module
//! defines the opaque hash value, the strength rules applied to plaintext
//! before it is hashed, and the trait adapters implement.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_PASSWORD_CHARS: usize = 128;

/// Opaque credential material (a PHC string for real hashers).
///
/// Never holds plaintext. `Debug` is redacted so accounts can be logged.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password must be at least {min} characters long")]
    TooShort { min: usize },

    #[error("password must be at most {max} characters long")]
    TooLong { max: usize },

    #[error("password hashing failed: {0}")]
    HashingFailed(String),

    #[error("invalid password hash format")]
    InvalidHashFormat,
}

/// Strength rules applied before hashing.
pub fn validate_password(plaintext: &str) -> Result<(), PasswordError> {
    let len = plaintext.chars().count();
    if len < MIN_PASSWORD_CHARS {
        return Err(PasswordError::TooShort { min: MIN_PASSWORD_CHARS });
    }
    if len > MAX_PASSWORD_CHARS {
        return Err(PasswordError::TooLong { max: MAX_PASSWORD_CHARS });
    }
    Ok(())
}

/// Hash / verify contract implemented by infrastructure.
pub trait PasswordHasher: Send + Sync {
    /// Hash plaintext with a fresh salt.
    fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordError>;

    /// Check plaintext against a stored hash. A mismatch is `Ok(false)`.
    fn verify(&self, plaintext: &str, hash: &PasswordHash) -> Result<bool, PasswordError>;
}

impl<H> PasswordHasher for Arc<H>
where
    H: PasswordHasher + ?Sized,
{
    fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordError> {
        (**self).hash(plaintext)
    }

    fn verify(&self, plaintext: &str, hash: &PasswordHash) -> Result<bool, PasswordError> {
        (**self).verify(plaintext, hash)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Reversible stand-in so unit tests stay fast. Only for tests.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct PlainHasher;

    impl PasswordHasher for PlainHasher {
        fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordError> {
            Ok(PasswordHash::new(format!("plain${plaintext}")))
        }

        fn verify(&self, plaintext: &str, hash: &PasswordHash) -> Result<bool, PasswordError> {
            let stored = hash
                .as_str()
                .strip_prefix("plain$")
                .ok_or(PasswordError::InvalidHashFormat)?;
            Ok(stored == plaintext)
        }
    }
}
