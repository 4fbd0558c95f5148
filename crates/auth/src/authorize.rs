//! Admin authorization checks.
//!
//! Pure policy: no IO, no panics. The API resolves the acting account first and
//! calls these before dispatching an admin operation.

use accountdesk_core::{AccountId, DomainError};

use crate::Account;

/// The actor must be an approved, non-revoked administrator.
pub fn require_admin(actor: &Account) -> Result<(), DomainError> {
    if !actor.is_admin() {
        return Err(DomainError::forbidden("admin role required"));
    }
    if !actor.is_approved || actor.is_revoked {
        return Err(DomainError::forbidden("admin account is not active"));
    }
    Ok(())
}

/// Admins may not run the approval workflow on themselves.
pub fn ensure_not_self(actor: &Account, target: AccountId) -> Result<(), DomainError> {
    if actor.id == target {
        return Err(DomainError::forbidden("cannot change your own account"));
    }
    Ok(())
}
