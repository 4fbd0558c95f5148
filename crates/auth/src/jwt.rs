//! HS256 session tokens.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::{SessionClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token could not be encoded: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),

    #[error("invalid token: {0}")]
    Decode(#[source] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

pub trait JwtIssuer: Send + Sync {
    fn issue(&self, claims: &SessionClaims) -> Result<String, JwtError>;
}

/// Verifies a bearer token and returns claims that are inside their time window.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, JwtError>;
}

impl<T> JwtIssuer for Arc<T>
where
    T: JwtIssuer + ?Sized,
{
    fn issue(&self, claims: &SessionClaims) -> Result<String, JwtError> {
        (**self).issue(claims)
    }
}

impl<T> JwtValidator for Arc<T>
where
    T: JwtValidator + ?Sized,
{
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, JwtError> {
        (**self).validate(token, now)
    }
}

/// Shared-secret signer / verifier.
#[derive(Clone)]
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Hs256Jwt {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time checks go through `validate_claims` with an explicit clock.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl core::fmt::Debug for Hs256Jwt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Jwt").finish_non_exhaustive()
    }
}

impl JwtIssuer for Hs256Jwt {
    fn issue(&self, claims: &SessionClaims) -> Result<String, JwtError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(JwtError::Encode)
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, JwtError> {
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map_err(JwtError::Decode)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::Role;
    use accountdesk_core::AccountId;

    fn claims(now: DateTime<Utc>, ttl: Duration) -> SessionClaims {
        SessionClaims {
            sub: AccountId::new(),
            roles: vec![Role::USER],
            ver: 2,
            issued_at: now - Duration::seconds(5),
            expires_at: now + ttl,
        }
    }

    #[test]
    fn issued_token_validates_with_same_secret() {
        let jwt = Hs256Jwt::new(b"test-secret");
        let now = Utc::now();
        let claims = claims(now, Duration::minutes(10));

        let token = jwt.issue(&claims).unwrap();
        let decoded = jwt.validate(&token, now).unwrap();

        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.ver, 2);
        assert_eq!(decoded.roles, vec![Role::USER]);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let now = Utc::now();
        let token = Hs256Jwt::new(b"one").issue(&claims(now, Duration::minutes(10))).unwrap();

        assert!(matches!(
            Hs256Jwt::new(b"two").validate(&token, now),
            Err(JwtError::Decode(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = Hs256Jwt::new(b"test-secret");
        let now = Utc::now();
        let token = jwt.issue(&claims(now, Duration::minutes(1))).unwrap();

        assert!(matches!(
            jwt.validate(&token, now + Duration::minutes(2)),
            Err(JwtError::Claims(TokenValidationError::Expired))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Hs256Jwt::new(b"s").validate("not-a-jwt", Utc::now()).is_err());
    }
}
