//! Account lifecycle manager.
//!
//! Each operation takes the target account explicitly, drives it through the
//! aggregate and returns a [`Transition`]: the events that were applied plus
//! the flash message the presentation layer should show. Loading and saving
//! the account is the caller's job.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use accountdesk_core::{AccountId, Aggregate, DomainError};
use accountdesk_events::Event;

use crate::account::{
    Account, AccountAction, AccountCommand, AccountEvent, AssignRoles, ChangeDetails,
    ChangePassword, RegisterAccount, UpdateProfile,
};
use crate::{Flash, PasswordError, PasswordHasher, Role, validate_password};

/// User-facing texts attached to transitions.
pub mod messages {
    pub const REGISTERED: &str = "Your account has been created and is awaiting approval.";
    pub const APPROVED: &str = "Account approved.";
    pub const UNAPPROVED: &str = "Account unapproved.";
    pub const REVOKED: &str = "Account revoked.";
    pub const RESTORED: &str = "Account restored.";
    pub const REVOKE_REQUIRES_APPROVAL: &str = "Only approved accounts can be revoked.";
    pub const PASSWORD_CHANGED: &str = "Your password has changed, you will be logged out.";
    pub const PROFILE_UPDATED: &str = "Profile updated.";
    pub const APPROVAL_REQUIRED: &str = "Your account must be approved first.";
    pub const ROLES_UPDATED: &str = "Roles updated.";
    pub const ACCOUNT_UPDATED: &str = "Account updated.";
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Outcome of a lifecycle operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Events applied to the account, in order. Empty for a no-op.
    pub events: Vec<AccountEvent>,
    pub flash: Flash,
}

impl Transition {
    pub fn is_noop(&self) -> bool {
        self.events.is_empty()
    }

    pub fn requires_relog(&self) -> bool {
        self.flash.requires_relog()
    }
}

/// Admin actions offered for an account in listings and detail views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    Approve,
    Disapprove,
    Revoke,
    Restore,
}

/// Which admin actions make sense for the account's current state.
///
/// Revoke and restore are only offered on approved accounts.
pub fn available_actions(account: &Account) -> Vec<AdminAction> {
    match (account.is_approved, account.is_revoked) {
        (false, _) => vec![AdminAction::Approve],
        (true, false) => vec![AdminAction::Disapprove, AdminAction::Revoke],
        (true, true) => vec![AdminAction::Disapprove, AdminAction::Restore],
    }
}

/// Stateless driver of the approval / revocation state machine.
///
/// The hasher is only touched by operations that take plaintext.
#[derive(Debug, Clone)]
pub struct AccountLifecycle<H> {
    hasher: H,
}

impl<H> AccountLifecycle<H>
where
    H: PasswordHasher,
{
    pub fn new(hasher: H) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Build a brand new pending account from registration input.
    pub fn register(
        &self,
        account_id: AccountId,
        email: &str,
        display_name: &str,
        plaintext_password: &str,
        occurred_at: DateTime<Utc>,
    ) -> Result<(Account, Transition), LifecycleError> {
        validate_password(plaintext_password).map_err(|e| DomainError::validation(e.to_string()))?;
        let password_hash = self.hasher.hash(plaintext_password)?;

        let mut account = Account::empty(account_id);
        let events = account.execute(&AccountCommand::Register(RegisterAccount {
            account_id,
            email: email.to_string(),
            display_name: display_name.to_string(),
            password_hash,
            occurred_at,
        }))?;

        let transition = finish(&account, events, Flash::success(messages::REGISTERED));
        Ok((account, transition))
    }

    pub fn approve(
        &self,
        account: &mut Account,
        occurred_at: DateTime<Utc>,
    ) -> Result<Transition, LifecycleError> {
        let events = account.execute(&AccountCommand::Approve(action(account, occurred_at)))?;
        Ok(finish(account, events, Flash::success(messages::APPROVED)))
    }

    pub fn disapprove(
        &self,
        account: &mut Account,
        occurred_at: DateTime<Utc>,
    ) -> Result<Transition, LifecycleError> {
        let events = account.execute(&AccountCommand::Disapprove(action(account, occurred_at)))?;
        Ok(finish(account, events, Flash::warning(messages::UNAPPROVED)))
    }

    /// Approve when unapproved, disapprove otherwise.
    pub fn toggle_approval(
        &self,
        account: &mut Account,
        occurred_at: DateTime<Utc>,
    ) -> Result<Transition, LifecycleError> {
        let events = account.execute(&AccountCommand::ToggleApproval(action(account, occurred_at)))?;

        let flash = if account.is_approved {
            Flash::success(messages::APPROVED)
        } else {
            Flash::warning(messages::UNAPPROVED)
        };
        Ok(finish(account, events, flash))
    }

    /// Revoke an approved account, or restore a revoked one.
    ///
    /// Unapproved accounts are left untouched and get a warning instead.
    pub fn toggle_revoke(
        &self,
        account: &mut Account,
        occurred_at: DateTime<Utc>,
    ) -> Result<Transition, LifecycleError> {
        let was_approved = account.is_approved;
        let events = account.execute(&AccountCommand::ToggleRevoke(action(account, occurred_at)))?;

        let flash = if !was_approved {
            Flash::warning(messages::REVOKE_REQUIRES_APPROVAL)
        } else if account.is_revoked {
            Flash::warning(messages::REVOKED)
        } else {
            Flash::success(messages::RESTORED)
        };
        Ok(finish(account, events, flash))
    }

    /// Replace the password hash. Existing sessions become stale.
    pub fn change_password(
        &self,
        account: &mut Account,
        plaintext_password: &str,
        occurred_at: DateTime<Utc>,
    ) -> Result<Transition, LifecycleError> {
        let cmd = self.change_password_command(account, plaintext_password, occurred_at)?;
        let events = account.execute(&cmd)?;
        Ok(finish(account, events, Flash::relog_required(messages::PASSWORD_CHANGED)))
    }

    /// Self-service profile edit.
    ///
    /// Unapproved accounts get `DomainError::Forbidden`. A non-empty new password
    /// is handled as a password change and the result asks for a new login.
    pub fn update_profile(
        &self,
        account: &mut Account,
        display_name: &str,
        new_password: Option<&str>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Transition, LifecycleError> {
        let update = AccountCommand::UpdateProfile(UpdateProfile {
            account_id: account.id,
            display_name: display_name.to_string(),
            occurred_at,
        });
        // Decide everything before mutating so a bad password leaves the name alone.
        let mut events = account.handle(&update)?;

        let password_cmd = match new_password.filter(|p| !p.is_empty()) {
            Some(plaintext) => Some(self.change_password_command(account, plaintext, occurred_at)?),
            None => None,
        };

        for event in &events {
            account.apply(event);
        }

        let flash = match password_cmd {
            Some(cmd) => {
                events.extend(account.execute(&cmd)?);
                Flash::relog_required(messages::PASSWORD_CHANGED)
            }
            None => Flash::success(messages::PROFILE_UPDATED),
        };
        Ok(finish(account, events, flash))
    }

    /// Admin edit of email, display name and, optionally, the password.
    ///
    /// Works in any lifecycle state. An empty or absent password keeps the
    /// current one; a new one bumps the credential version like any change.
    pub fn edit_account(
        &self,
        account: &mut Account,
        email: &str,
        display_name: &str,
        new_password: Option<&str>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Transition, LifecycleError> {
        let details = AccountCommand::ChangeDetails(ChangeDetails {
            account_id: account.id,
            email: email.to_string(),
            display_name: display_name.to_string(),
            occurred_at,
        });
        let mut events = account.handle(&details)?;

        let password_cmd = match new_password.filter(|p| !p.is_empty()) {
            Some(plaintext) => Some(self.change_password_command(account, plaintext, occurred_at)?),
            None => None,
        };

        for event in &events {
            account.apply(event);
        }
        if let Some(cmd) = password_cmd {
            events.extend(account.execute(&cmd)?);
        }
        Ok(finish(account, events, Flash::success(messages::ACCOUNT_UPDATED)))
    }

    /// Replace the role set of an approved account (admin edit).
    pub fn assign_roles(
        &self,
        account: &mut Account,
        roles: BTreeSet<Role>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Transition, LifecycleError> {
        let events = account.execute(&AccountCommand::AssignRoles(AssignRoles {
            account_id: account.id,
            roles,
            occurred_at,
        }))?;
        Ok(finish(account, events, Flash::success(messages::ROLES_UPDATED)))
    }

    fn change_password_command(
        &self,
        account: &Account,
        plaintext_password: &str,
        occurred_at: DateTime<Utc>,
    ) -> Result<AccountCommand, LifecycleError> {
        validate_password(plaintext_password).map_err(|e| DomainError::validation(e.to_string()))?;
        let password_hash = self.hasher.hash(plaintext_password)?;
        Ok(AccountCommand::ChangePassword(ChangePassword {
            account_id: account.id,
            password_hash,
            occurred_at,
        }))
    }
}

fn action(account: &Account, occurred_at: DateTime<Utc>) -> AccountAction {
    AccountAction {
        account_id: account.id,
        occurred_at,
    }
}

fn finish(account: &Account, events: Vec<AccountEvent>, flash: Flash) -> Transition {
    for event in &events {
        tracing::debug!(
            account_id = %account.id,
            event_type = event.event_type(),
            version = account.version,
            "account event applied"
        );
    }
    Transition { events, flash }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlashKind;
    use crate::password::testing::PlainHasher;
    use crate::account::LifecycleState;
    use proptest::prelude::*;

    fn lifecycle() -> AccountLifecycle<PlainHasher> {
        AccountLifecycle::new(PlainHasher)
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn pending(email: &str) -> Account {
        let (account, _) = lifecycle()
            .register(AccountId::new(), email, "Alice", "correct horse", now())
            .unwrap();
        account
    }

    fn approved(email: &str) -> Account {
        let mut account = pending(email);
        lifecycle().approve(&mut account, now()).unwrap();
        account
    }

    #[test]
    fn register_builds_pending_account() {
        let (account, transition) = lifecycle()
            .register(AccountId::new(), "a@x.com", "Alice", "correct horse", now())
            .unwrap();

        assert_eq!(account.roles, BTreeSet::from([Role::PENDING]));
        assert!(!account.is_approved);
        assert!(!account.is_revoked);
        assert_eq!(account.password_hash.as_str(), "plain$correct horse");
        assert_eq!(transition.flash, Flash::success(messages::REGISTERED));
        assert_eq!(transition.events.len(), 1);
    }

    #[test]
    fn register_rejects_weak_password_before_hashing() {
        let err = lifecycle()
            .register(AccountId::new(), "a@x.com", "Alice", "short", now())
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Domain(DomainError::Validation(_))));
    }

    #[test]
    fn approve_flashes_success_and_sets_user_role() {
        let mut account = pending("a@x.com");
        let transition = lifecycle().approve(&mut account, now()).unwrap();

        assert_eq!(transition.flash.kind, FlashKind::Success);
        assert_eq!(transition.flash.message, messages::APPROVED);
        assert!(account.is_approved);
        assert_eq!(account.roles, BTreeSet::from([Role::USER]));
    }

    #[test]
    fn disapprove_flashes_warning() {
        let mut account = approved("a@x.com");
        let transition = lifecycle().disapprove(&mut account, now()).unwrap();

        assert_eq!(transition.flash, Flash::warning(messages::UNAPPROVED));
        assert!(!account.is_approved);
        assert_eq!(account.roles, BTreeSet::from([Role::USER]));
    }

    #[test]
    fn toggle_approval_goes_both_ways() {
        let mut account = pending("a@x.com");

        let t = lifecycle().toggle_approval(&mut account, now()).unwrap();
        assert_eq!(t.flash.message, messages::APPROVED);
        assert!(account.is_approved);

        let t = lifecycle().toggle_approval(&mut account, now()).unwrap();
        assert_eq!(t.flash.message, messages::UNAPPROVED);
        assert!(!account.is_approved);
    }

    #[test]
    fn toggle_revoke_messages_follow_direction() {
        let mut account = approved("a@x.com");

        let t = lifecycle().toggle_revoke(&mut account, now()).unwrap();
        assert_eq!(t.flash, Flash::warning(messages::REVOKED));
        assert_eq!(account.lifecycle_state(), LifecycleState::Revoked);

        let t = lifecycle().toggle_revoke(&mut account, now()).unwrap();
        assert_eq!(t.flash, Flash::success(messages::RESTORED));
        assert_eq!(account.lifecycle_state(), LifecycleState::Approved);
    }

    #[test]
    fn toggle_revoke_on_pending_account_is_a_warning_noop() {
        let mut account = pending("a@x.com");
        let before = account.clone();

        let t = lifecycle().toggle_revoke(&mut account, now()).unwrap();

        assert!(t.is_noop());
        assert_eq!(t.flash, Flash::warning(messages::REVOKE_REQUIRES_APPROVAL));
        assert_eq!(account, before);
    }

    #[test]
    fn change_password_requires_relog() {
        let mut account = approved("a@x.com");
        let before = account.password_hash.clone();

        let t = lifecycle().change_password(&mut account, "brand new secret", now()).unwrap();

        assert!(t.requires_relog());
        assert_ne!(account.password_hash, before);
        assert_eq!(account.credential_version, 1);
    }

    #[test]
    fn update_profile_without_password_is_plain_success() {
        let mut account = approved("a@x.com");
        let t = lifecycle().update_profile(&mut account, "Bob", None, now()).unwrap();

        assert_eq!(t.flash, Flash::success(messages::PROFILE_UPDATED));
        assert_eq!(account.display_name, "Bob");
        assert_eq!(account.credential_version, 0);
    }

    #[test]
    fn update_profile_treats_empty_password_as_absent() {
        let mut account = approved("a@x.com");
        let t = lifecycle().update_profile(&mut account, "Bob", Some(""), now()).unwrap();
        assert!(!t.requires_relog());
    }

    #[test]
    fn update_profile_with_password_changes_hash_and_requires_relog() {
        let mut account = approved("a@x.com");
        let before = account.password_hash.clone();

        let t = lifecycle()
            .update_profile(&mut account, "Bob", Some("another secret"), now())
            .unwrap();

        assert!(t.requires_relog());
        assert_eq!(t.flash.kind, FlashKind::RelogRequired);
        assert_eq!(t.events.len(), 2);
        assert_ne!(account.password_hash, before);
        assert_eq!(account.display_name, "Bob");
    }

    #[test]
    fn update_profile_is_forbidden_for_unapproved_accounts() {
        let mut account = pending("a@x.com");
        let err = lifecycle().update_profile(&mut account, "Bob", None, now()).unwrap_err();

        assert!(matches!(err, LifecycleError::Domain(DomainError::Forbidden(_))));
        assert_eq!(account.display_name, "Alice");
    }

    #[test]
    fn update_profile_with_weak_password_changes_nothing() {
        let mut account = approved("a@x.com");
        let before = account.clone();

        let err = lifecycle()
            .update_profile(&mut account, "Bob", Some("short"), now())
            .unwrap_err();

        assert!(matches!(err, LifecycleError::Domain(DomainError::Validation(_))));
        assert_eq!(account, before);
    }

    #[test]
    fn edit_account_changes_details_of_pending_accounts() {
        let mut account = pending("a@x.com");

        let t = lifecycle()
            .edit_account(&mut account, "B@x.com", "Bob", None, now())
            .unwrap();

        assert_eq!(t.flash, Flash::success(messages::ACCOUNT_UPDATED));
        assert_eq!(account.email, "b@x.com");
        assert_eq!(account.display_name, "Bob");
        assert_eq!(account.lifecycle_state(), LifecycleState::Pending);
        assert_eq!(account.roles, BTreeSet::from([Role::PENDING]));
        assert_eq!(account.credential_version, 0);
    }

    #[test]
    fn edit_account_password_reset_bumps_credential_version() {
        let mut account = approved("a@x.com");

        let t = lifecycle()
            .edit_account(&mut account, "a@x.com", "Alice", Some("reset password"), now())
            .unwrap();

        assert_eq!(t.events.len(), 1);
        assert!(!t.requires_relog());
        assert_eq!(account.credential_version, 1);
        assert_eq!(account.password_hash.as_str(), "plain$reset password");
    }

    #[test]
    fn edit_account_with_weak_password_changes_nothing() {
        let mut account = approved("a@x.com");
        let before = account.clone();

        let err = lifecycle()
            .edit_account(&mut account, "b@x.com", "Bob", Some("short"), now())
            .unwrap_err();

        assert!(matches!(err, LifecycleError::Domain(DomainError::Validation(_))));
        assert_eq!(account, before);
    }

    #[test]
    fn available_actions_follow_state() {
        let mut account = pending("a@x.com");
        assert_eq!(available_actions(&account), vec![AdminAction::Approve]);

        lifecycle().approve(&mut account, now()).unwrap();
        assert_eq!(
            available_actions(&account),
            vec![AdminAction::Disapprove, AdminAction::Revoke]
        );

        lifecycle().toggle_revoke(&mut account, now()).unwrap();
        assert_eq!(
            available_actions(&account),
            vec![AdminAction::Disapprove, AdminAction::Restore]
        );
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Approve,
        Disapprove,
        ToggleApproval,
        ToggleRevoke,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Approve),
            Just(Op::Disapprove),
            Just(Op::ToggleApproval),
            Just(Op::ToggleRevoke),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: no sequence of admin operations can leave an account revoked
        /// without being approved.
        #[test]
        fn revoked_implies_approved(ops in prop::collection::vec(op(), 0..32)) {
            let lifecycle = lifecycle();
            let mut account = pending("a@x.com");

            for op in ops {
                match op {
                    Op::Approve => lifecycle.approve(&mut account, now()).unwrap(),
                    Op::Disapprove => lifecycle.disapprove(&mut account, now()).unwrap(),
                    Op::ToggleApproval => lifecycle.toggle_approval(&mut account, now()).unwrap(),
                    Op::ToggleRevoke => lifecycle.toggle_revoke(&mut account, now()).unwrap(),
                };
                prop_assert!(!account.is_revoked || account.is_approved);
            }
        }

        /// Property: toggling revocation twice on an approved account restores
        /// its observable state.
        #[test]
        fn toggle_revoke_is_an_involution(ops in prop::collection::vec(op(), 0..16)) {
            let lifecycle = lifecycle();
            let mut account = approved("a@x.com");
            for op in ops {
                if let Op::ToggleRevoke = op {
                    lifecycle.toggle_revoke(&mut account, now()).unwrap();
                }
            }

            let before = (account.is_approved, account.is_revoked, account.roles.clone());
            lifecycle.toggle_revoke(&mut account, now()).unwrap();
            lifecycle.toggle_revoke(&mut account, now()).unwrap();

            prop_assert_eq!(before, (account.is_approved, account.is_revoked, account.roles.clone()));
        }

        /// Property: approving once or many times gives the same observable state.
        #[test]
        fn approve_is_idempotent(times in 1usize..6) {
            let lifecycle = lifecycle();
            let mut once = pending("a@x.com");
            lifecycle.approve(&mut once, now()).unwrap();

            let mut many = once.clone();
            for _ in 1..times {
                let t = lifecycle.approve(&mut many, now()).unwrap();
                prop_assert!(t.is_noop());
            }

            prop_assert_eq!(once, many);
        }
    }
}
