//! Authentication gate: who may log in, and which sessions are still good.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{Account, PasswordError, PasswordHash, PasswordHasher, SessionClaims, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password. Deliberately does not say which.
    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("Your account is awaiting approval by an administrator.")]
    PendingApproval,

    #[error("Your account access has been revoked.")]
    Revoked,

    #[error("Your session has expired, please log in again.")]
    SessionExpired,

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Decide whether a login attempt succeeds.
///
/// Credentials are checked first so approval state never leaks for a wrong
/// password. For an unknown email the password is still verified, against
/// `decoy`, so both rejections cost one hash verification.
pub fn authenticate<H>(
    account: Option<&Account>,
    password: &str,
    hasher: &H,
    decoy: &PasswordHash,
) -> Result<(), AuthError>
where
    H: PasswordHasher + ?Sized,
{
    let Some(account) = account else {
        let _ = hasher.verify(password, decoy);
        return Err(AuthError::InvalidCredentials);
    };

    if !hasher.verify(password, &account.password_hash)? {
        return Err(AuthError::InvalidCredentials);
    }
    if !account.is_approved {
        return Err(AuthError::PendingApproval);
    }
    if account.is_revoked {
        return Err(AuthError::Revoked);
    }
    Ok(())
}

/// Validate a decoded session against the current account state.
///
/// Unapproved accounts keep their session; callers gate individual pages.
pub fn check_session(account: &Account, claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), AuthError> {
    validate_claims(claims, now).map_err(|_| AuthError::SessionExpired)?;

    if claims.sub != account.id {
        return Err(AuthError::InvalidCredentials);
    }
    // Password changed since the token was minted.
    if claims.ver != account.credential_version {
        return Err(AuthError::SessionExpired);
    }
    if account.is_revoked {
        return Err(AuthError::Revoked);
    }
    Ok(())
}
