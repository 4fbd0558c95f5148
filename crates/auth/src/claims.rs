use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use accountdesk_core::AccountId;

use crate::{Account, Role};

/// Session token claims (transport-agnostic).
///
/// What the API expects once a bearer token has been decoded and its signature
/// verified. `ver` pins the account's credential version at login time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject / account identifier.
    pub sub: AccountId,

    /// Roles held when the session was opened (informational only).
    pub roles: Vec<Role>,

    /// Credential version the session was minted for.
    pub ver: u32,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl SessionClaims {
    /// Claims for a fresh session on `account`, valid for `ttl`.
    pub fn for_account(account: &Account, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: account.id,
            roles: account.roles.iter().cloned().collect(),
            ver: account.credential_version,
            issued_at: now,
            expires_at: now + ttl,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate the claim time window.
///
/// Signature verification happens in [`crate::jwt`]; this only looks at times.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> SessionClaims {
        SessionClaims {
            sub: AccountId::new(),
            roles: vec![Role::USER],
            ver: 0,
            issued_at,
            expires_at,
        }
    }

    #[test]
    fn time_window_checks() {
        let now = Utc::now();

        assert_eq!(validate_claims(&claims(now - Duration::minutes(1), now + Duration::minutes(1)), now), Ok(()));
        assert_eq!(
            validate_claims(&claims(now - Duration::minutes(2), now - Duration::minutes(1)), now),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_claims(&claims(now + Duration::minutes(1), now + Duration::minutes(2)), now),
            Err(TokenValidationError::NotYetValid)
        );
        assert_eq!(
            validate_claims(&claims(now, now), now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn for_account_copies_credential_version() {
        let mut account = Account::empty(AccountId::new());
        account.credential_version = 3;
        account.roles.insert(Role::USER);
        let now = Utc::now();

        let claims = SessionClaims::for_account(&account, now, Duration::minutes(30));

        assert_eq!(claims.sub, account.id);
        assert_eq!(claims.ver, 3);
        assert_eq!(claims.roles, vec![Role::USER]);
        assert_eq!(claims.expires_at - claims.issued_at, Duration::minutes(30));
    }
}
