//! Account application service.
//!
//! One call is one load / decide / save / publish cycle:
//!
//! ```text
//! load account from store
//!   ↓
//! authorize actor (admin operations)
//!   ↓
//! run lifecycle operation (pure, returns events + flash)
//!   ↓
//! save account (only when something changed)
//!   ↓
//! publish events to the bus
//! ```
//!
//! The store is the source of truth; the bus feeds side channels such as the
//! audit log. A publish failure is reported after the save has happened.

use std::collections::BTreeSet;

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use accountdesk_auth::{
    Account, AccountEvent, AccountLifecycle, AuthError, Flash, LifecycleError, PasswordError,
    PasswordHash, PasswordHasher, Role, SessionClaims, Transition, authenticate, check_session, ensure_not_self,
    normalize_email, require_admin,
};
use accountdesk_core::{AccountId, DomainError};
use accountdesk_events::{EventBus, EventEnvelope};

use crate::account_store::{AccountStore, StoreError};

pub const ACCOUNT_AGGREGATE_TYPE: &str = "auth.account";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("account not found")]
    NotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvariantViolation(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Auth(AuthError),

    #[error(transparent)]
    Password(PasswordError),

    #[error(transparent)]
    Store(StoreError),

    /// Publication failed after a successful save.
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::InvariantViolation(msg) => ServiceError::InvariantViolation(msg),
            DomainError::NotFound => ServiceError::NotFound,
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
            DomainError::Forbidden(msg) => ServiceError::Forbidden(msg),
        }
    }
}

impl From<LifecycleError> for ServiceError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::Domain(e) => e.into(),
            LifecycleError::Password(e) => ServiceError::Password(e),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::Password(e) => ServiceError::Password(e),
            other => ServiceError::Auth(other),
        }
    }
}

impl From<PasswordError> for ServiceError {
    fn from(value: PasswordError) -> Self {
        ServiceError::Password(value)
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateEmail(_) => ServiceError::Validation(EMAIL_TAKEN.to_string()),
            other => ServiceError::Store(other),
        }
    }
}

const EMAIL_TAKEN: &str = "email is already registered";

/// Plaintext behind the decoy hash verified for unknown emails at login.
const DECOY_PASSWORD: &str = "accountdesk-login-decoy";

/// Admin listing filter. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AccountFilter {
    pub approved: Option<bool>,
    pub revoked: Option<bool>,
    /// Case-insensitive substring over email and display name.
    pub q: Option<String>,
}

impl AccountFilter {
    pub fn matches(&self, account: &Account) -> bool {
        if self.approved.is_some_and(|want| account.is_approved != want) {
            return false;
        }
        if self.revoked.is_some_and(|want| account.is_revoked != want) {
            return false;
        }
        match self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => {
                let q = q.to_lowercase();
                account.email.to_lowercase().contains(&q)
                    || account.display_name.to_lowercase().contains(&q)
            }
            None => true,
        }
    }
}

#[derive(Debug)]
pub struct AccountService<S, H, B> {
    store: S,
    lifecycle: AccountLifecycle<H>,
    bus: B,
    /// Hashed once at startup with the real hasher, so an unknown email pays
    /// the same verification cost as a wrong password.
    decoy_hash: PasswordHash,
}

impl<S, H, B> AccountService<S, H, B>
where
    S: AccountStore,
    H: PasswordHasher,
    B: EventBus<EventEnvelope<AccountEvent>>,
{
    pub fn new(store: S, hasher: H, bus: B) -> Result<Self, ServiceError> {
        let decoy_hash = hasher.hash(DECOY_PASSWORD)?;
        Ok(Self {
            store,
            lifecycle: AccountLifecycle::new(hasher),
            bus,
            decoy_hash,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Self-service
    // ─────────────────────────────────────────────────────────────────────────

    pub fn register(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
    ) -> Result<(Account, Flash), ServiceError> {
        let normalized = normalize_email(email)?;
        if self.store.find_by_email(&normalized)?.is_some() {
            return Err(ServiceError::Validation(EMAIL_TAKEN.to_string()));
        }

        let (account, transition) =
            self.lifecycle
                .register(AccountId::new(), &normalized, display_name, password, Utc::now())?;
        self.persist(&account, &transition)?;

        tracing::info!(account_id = %account.id, "account registered");
        Ok((account, transition.flash))
    }

    /// Login check. Every failure that could reveal whether the email exists
    /// comes back as `InvalidCredentials`.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Account, ServiceError> {
        let account = match normalize_email(email) {
            Ok(email) => self.store.find_by_email(&email)?,
            Err(_) => None,
        };

        let hasher = self.lifecycle.hasher();
        if let Err(e) = authenticate(account.as_ref(), password, hasher, &self.decoy_hash) {
            tracing::warn!(
                account_id = ?account.as_ref().map(|a| a.id),
                reason = %e,
                "login rejected"
            );
            return Err(e.into());
        }

        // `authenticate` only succeeds with an account.
        account.ok_or(ServiceError::Auth(AuthError::InvalidCredentials))
    }

    /// Resolve the account behind a decoded session token.
    pub fn session_account(&self, claims: &SessionClaims) -> Result<Account, ServiceError> {
        let account = self
            .store
            .find(claims.sub)?
            .ok_or(ServiceError::Auth(AuthError::InvalidCredentials))?;
        check_session(&account, claims, Utc::now())?;
        Ok(account)
    }

    pub fn update_profile(
        &self,
        account_id: AccountId,
        display_name: &str,
        new_password: Option<&str>,
    ) -> Result<(Account, Transition), ServiceError> {
        let mut account = self.load(account_id)?;
        let transition = self
            .lifecycle
            .update_profile(&mut account, display_name, new_password, Utc::now())?;
        self.persist(&account, &transition)?;

        tracing::info!(
            account_id = %account.id,
            password_changed = transition.requires_relog(),
            "profile updated"
        );
        Ok((account, transition))
    }

    pub fn change_password(
        &self,
        account_id: AccountId,
        new_password: &str,
    ) -> Result<(Account, Transition), ServiceError> {
        let mut account = self.load(account_id)?;
        let transition = self
            .lifecycle
            .change_password(&mut account, new_password, Utc::now())?;
        self.persist(&account, &transition)?;

        tracing::info!(account_id = %account.id, "password changed");
        Ok((account, transition))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Admin
    // ─────────────────────────────────────────────────────────────────────────

    /// Accounts visible to an admin, never including the admin themself.
    pub fn list(&self, actor: &Account, filter: &AccountFilter) -> Result<Vec<Account>, ServiceError> {
        require_admin(actor)?;
        Ok(self
            .store
            .list()?
            .into_iter()
            .filter(|a| a.id != actor.id && filter.matches(a))
            .collect())
    }

    pub fn get(&self, actor: &Account, account_id: AccountId) -> Result<Account, ServiceError> {
        require_admin(actor)?;
        self.load(account_id)
    }

    pub fn approve(&self, actor: &Account, account_id: AccountId) -> Result<(Account, Transition), ServiceError> {
        self.admin_transition(actor, account_id, "approve", |lc, account| {
            lc.approve(account, Utc::now())
        })
    }

    pub fn disapprove(
        &self,
        actor: &Account,
        account_id: AccountId,
    ) -> Result<(Account, Transition), ServiceError> {
        self.admin_transition(actor, account_id, "disapprove", |lc, account| {
            lc.disapprove(account, Utc::now())
        })
    }

    pub fn toggle_approval(
        &self,
        actor: &Account,
        account_id: AccountId,
    ) -> Result<(Account, Transition), ServiceError> {
        self.admin_transition(actor, account_id, "toggle_approval", |lc, account| {
            lc.toggle_approval(account, Utc::now())
        })
    }

    pub fn toggle_revoke(
        &self,
        actor: &Account,
        account_id: AccountId,
    ) -> Result<(Account, Transition), ServiceError> {
        self.admin_transition(actor, account_id, "toggle_revoke", |lc, account| {
            lc.toggle_revoke(account, Utc::now())
        })
    }

    /// Admin edit of email, display name and optionally the password.
    ///
    /// An email already used by another account is a validation error.
    pub fn edit_account(
        &self,
        actor: &Account,
        account_id: AccountId,
        email: &str,
        display_name: &str,
        new_password: Option<&str>,
    ) -> Result<(Account, Transition), ServiceError> {
        self.admin_transition(actor, account_id, "edit_account", |lc, account| {
            lc.edit_account(account, email, display_name, new_password, Utc::now())
        })
    }

    pub fn assign_roles(
        &self,
        actor: &Account,
        account_id: AccountId,
        roles: BTreeSet<Role>,
    ) -> Result<(Account, Transition), ServiceError> {
        self.admin_transition(actor, account_id, "assign_roles", |lc, account| {
            lc.assign_roles(account, roles, Utc::now())
        })
    }

    /// Create the configured administrator if no account uses that email yet.
    ///
    /// An existing account with the email is returned untouched.
    pub fn bootstrap_admin(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
    ) -> Result<Account, ServiceError> {
        let normalized = normalize_email(email)?;
        if let Some(existing) = self.store.find_by_email(&normalized)? {
            tracing::info!(account_id = %existing.id, "bootstrap admin already present");
            return Ok(existing);
        }

        let now = Utc::now();
        let (mut account, registered) =
            self.lifecycle
                .register(AccountId::new(), &normalized, display_name, password, now)?;
        let approved = self.lifecycle.approve(&mut account, now)?;
        let promoted = self
            .lifecycle
            .assign_roles(&mut account, BTreeSet::from([Role::USER, Role::ADMIN]), now)?;

        let events = [registered.events, approved.events, promoted.events].concat();
        self.persist(&account, &Transition { events, flash: promoted.flash })?;

        tracing::info!(account_id = %account.id, "bootstrap admin created");
        Ok(account)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn load(&self, account_id: AccountId) -> Result<Account, ServiceError> {
        self.store.find(account_id)?.ok_or(ServiceError::NotFound)
    }

    fn admin_transition<F>(
        &self,
        actor: &Account,
        account_id: AccountId,
        operation: &'static str,
        run: F,
    ) -> Result<(Account, Transition), ServiceError>
    where
        F: FnOnce(&AccountLifecycle<H>, &mut Account) -> Result<Transition, LifecycleError>,
    {
        require_admin(actor)?;
        ensure_not_self(actor, account_id)?;

        let mut account = self.load(account_id)?;
        let transition = run(&self.lifecycle, &mut account)?;
        self.persist(&account, &transition)?;

        tracing::info!(
            actor_id = %actor.id,
            account_id = %account.id,
            operation,
            state = %account.lifecycle_state(),
            changed = !transition.is_noop(),
            "admin action"
        );
        Ok((account, transition))
    }

    fn persist(&self, account: &Account, transition: &Transition) -> Result<(), ServiceError> {
        if transition.is_noop() {
            return Ok(());
        }

        self.store.save(account)?;

        // `account.version` already counts every event in the transition.
        let base = account.version - transition.events.len() as u64;
        for (idx, event) in transition.events.iter().enumerate() {
            let envelope = EventEnvelope::new(
                Uuid::now_v7(),
                account.id,
                ACCOUNT_AGGREGATE_TYPE,
                base + idx as u64 + 1,
                event.clone(),
            );
            self.bus
                .publish(envelope)
                .map_err(|e| ServiceError::Publish(format!("{e:?}")))?;
        }
        Ok(())
    }
}
