//! Account aggregate: identity, credentials and approval state.
//!
//! Approval and revocation are two orthogonal flags, but revocation only means
//! something for an approved account:
//!
//! ```text
//! Pending(approved=F, revoked=F) --approve-->    Approved(T, F)
//! Approved                       --disapprove--> Pending
//! Approved                       --revoke-->     Revoked(T, T)
//! Revoked                        --restore-->    Approved
//! Revoked                        --disapprove--> Pending (revocation cleared)
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use accountdesk_core::{AccountId, Aggregate, AggregateRoot, DomainError};
use accountdesk_events::Event;

use crate::{PasswordHash, Role};

pub const MAX_EMAIL_CHARS: usize = 180;
pub const MAX_DISPLAY_NAME_CHARS: usize = 64;

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle State
// ─────────────────────────────────────────────────────────────────────────────

/// Where an account sits in the approval state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Registered, waiting for an administrator.
    Pending,
    /// Approved and allowed to log in.
    Approved,
    /// Approved earlier, access currently suspended.
    Revoked,
}

impl core::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LifecycleState::Pending => write!(f, "pending"),
            LifecycleState::Approved => write!(f, "approved"),
            LifecycleState::Revoked => write!(f, "revoked"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Account Aggregate
// ─────────────────────────────────────────────────────────────────────────────

/// Account aggregate.
///
/// # Invariants
/// - A freshly registered account is unapproved, unrevoked and holds `{PENDING}`.
/// - `is_revoked` implies `is_approved`.
/// - Approval replaces the role set with `{USER}`; disapproval keeps roles.
/// - `created_at` never changes after registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub display_name: String,
    pub password_hash: PasswordHash,
    pub roles: BTreeSet<Role>,
    pub is_approved: bool,
    pub is_revoked: bool,
    /// Bumped on every password change; sessions minted for an older value are stale.
    pub credential_version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
    pub created: bool,
}

impl Account {
    pub fn empty(id: AccountId) -> Self {
        Self {
            id,
            email: String::new(),
            display_name: String::new(),
            password_hash: PasswordHash::default(),
            roles: BTreeSet::new(),
            is_approved: false,
            is_revoked: false,
            credential_version: 0,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
            version: 0,
            created: false,
        }
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        match (self.is_approved, self.is_revoked) {
            (true, true) => LifecycleState::Revoked,
            (true, false) => LifecycleState::Approved,
            (false, _) => LifecycleState::Pending,
        }
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(&Role::ADMIN)
    }

    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    fn ensure_account_id(&self, account_id: AccountId) -> Result<(), DomainError> {
        if self.id != account_id {
            return Err(DomainError::invariant("account_id mismatch"));
        }
        Ok(())
    }

    fn ensure_target(&self, account_id: AccountId) -> Result<(), DomainError> {
        self.ensure_created()?;
        self.ensure_account_id(account_id)
    }
}

impl AggregateRoot for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Trim + lowercase an email and check its shape.
///
/// Used for registration and for every lookup by email, so the store only ever
/// sees the normalised form.
pub fn normalize_email(raw: &str) -> Result<String, DomainError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(DomainError::validation("email cannot be empty"));
    }
    if email.chars().count() > MAX_EMAIL_CHARS {
        return Err(DomainError::validation(format!(
            "email must be at most {MAX_EMAIL_CHARS} characters"
        )));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("invalid email format"));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(DomainError::validation("invalid email format"));
    };
    if local.is_empty() || domain.contains('@') {
        return Err(DomainError::validation("invalid email format"));
    }
    let domain_ok = domain
        .split('.')
        .collect::<Vec<_>>()
        .windows(2)
        .all(|w| !w[0].is_empty() && !w[1].is_empty());
    if !domain.contains('.') || !domain_ok {
        return Err(DomainError::validation("invalid email format"));
    }

    Ok(email)
}

fn normalize_display_name(raw: &str) -> Result<String, DomainError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation("display name cannot be empty"));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
        return Err(DomainError::validation(format!(
            "display name must be at most {MAX_DISPLAY_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Self-registration. The password arrives already hashed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterAccount {
    pub account_id: AccountId,
    pub email: String,
    pub display_name: String,
    pub password_hash: PasswordHash,
    pub occurred_at: DateTime<Utc>,
}

/// Command targeting an existing account with no payload besides its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountAction {
    pub account_id: AccountId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePassword {
    pub account_id: AccountId,
    pub password_hash: PasswordHash,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProfile {
    pub account_id: AccountId,
    pub display_name: String,
    pub occurred_at: DateTime<Utc>,
}

/// Admin edit of the identity fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeDetails {
    pub account_id: AccountId,
    pub email: String,
    pub display_name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRoles {
    pub account_id: AccountId,
    pub roles: BTreeSet<Role>,
    pub occurred_at: DateTime<Utc>,
}

/// All account commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AccountCommand {
    Register(RegisterAccount),
    Approve(AccountAction),
    Disapprove(AccountAction),
    ToggleApproval(AccountAction),
    ToggleRevoke(AccountAction),
    ChangePassword(ChangePassword),
    UpdateProfile(UpdateProfile),
    ChangeDetails(ChangeDetails),
    AssignRoles(AssignRoles),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRegistered {
    pub account_id: AccountId,
    pub email: String,
    pub display_name: String,
    pub password_hash: PasswordHash,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountApproved {
    pub account_id: AccountId,
    /// Role set after approval (always `{USER}` today).
    pub roles: BTreeSet<Role>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDisapproved {
    pub account_id: AccountId,
    /// The account was revoked when it lost approval.
    pub cleared_revocation: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRevoked {
    pub account_id: AccountId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRestored {
    pub account_id: AccountId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordChanged {
    pub account_id: AccountId,
    pub password_hash: PasswordHash,
    pub credential_version: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdated {
    pub account_id: AccountId,
    pub display_name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailsChanged {
    pub account_id: AccountId,
    pub email: String,
    pub display_name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolesAssigned {
    pub account_id: AccountId,
    pub roles: BTreeSet<Role>,
    pub occurred_at: DateTime<Utc>,
}

/// All account events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccountEvent {
    Registered(AccountRegistered),
    Approved(AccountApproved),
    Disapproved(AccountDisapproved),
    Revoked(AccountRevoked),
    Restored(AccountRestored),
    PasswordChanged(PasswordChanged),
    ProfileUpdated(ProfileUpdated),
    DetailsChanged(DetailsChanged),
    RolesAssigned(RolesAssigned),
}

impl Event for AccountEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::Registered(_) => "auth.account.registered",
            AccountEvent::Approved(_) => "auth.account.approved",
            AccountEvent::Disapproved(_) => "auth.account.disapproved",
            AccountEvent::Revoked(_) => "auth.account.revoked",
            AccountEvent::Restored(_) => "auth.account.restored",
            AccountEvent::PasswordChanged(_) => "auth.account.password_changed",
            AccountEvent::ProfileUpdated(_) => "auth.account.profile_updated",
            AccountEvent::DetailsChanged(_) => "auth.account.details_changed",
            AccountEvent::RolesAssigned(_) => "auth.account.roles_assigned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AccountEvent::Registered(e) => e.occurred_at,
            AccountEvent::Approved(e) => e.occurred_at,
            AccountEvent::Disapproved(e) => e.occurred_at,
            AccountEvent::Revoked(e) => e.occurred_at,
            AccountEvent::Restored(e) => e.occurred_at,
            AccountEvent::PasswordChanged(e) => e.occurred_at,
            AccountEvent::ProfileUpdated(e) => e.occurred_at,
            AccountEvent::DetailsChanged(e) => e.occurred_at,
            AccountEvent::RolesAssigned(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for Account {
    type Command = AccountCommand;
    type Event = AccountEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AccountEvent::Registered(e) => self.apply_registered(e),
            AccountEvent::Approved(e) => self.apply_approved(e),
            AccountEvent::Disapproved(e) => self.apply_disapproved(e),
            AccountEvent::Revoked(e) => self.apply_revoked(e),
            AccountEvent::Restored(e) => self.apply_restored(e),
            AccountEvent::PasswordChanged(e) => self.apply_password_changed(e),
            AccountEvent::ProfileUpdated(e) => self.apply_profile_updated(e),
            AccountEvent::DetailsChanged(e) => self.apply_details_changed(e),
            AccountEvent::RolesAssigned(e) => self.apply_roles_assigned(e),
        }
        self.updated_at = event.occurred_at();
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AccountCommand::Register(cmd) => self.handle_register(cmd),
            AccountCommand::Approve(cmd) => self.handle_approve(cmd),
            AccountCommand::Disapprove(cmd) => self.handle_disapprove(cmd),
            AccountCommand::ToggleApproval(cmd) => self.handle_toggle_approval(cmd),
            AccountCommand::ToggleRevoke(cmd) => self.handle_toggle_revoke(cmd),
            AccountCommand::ChangePassword(cmd) => self.handle_change_password(cmd),
            AccountCommand::UpdateProfile(cmd) => self.handle_update_profile(cmd),
            AccountCommand::ChangeDetails(cmd) => self.handle_change_details(cmd),
            AccountCommand::AssignRoles(cmd) => self.handle_assign_roles(cmd),
        }
    }
}

impl Account {
    // ─────────────────────────────────────────────────────────────────────────
    // Command Handlers
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_register(&self, cmd: &RegisterAccount) -> Result<Vec<AccountEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("account already exists"));
        }
        self.ensure_account_id(cmd.account_id)?;

        let email = normalize_email(&cmd.email)?;
        let display_name = normalize_display_name(&cmd.display_name)?;

        if cmd.password_hash.is_empty() {
            return Err(DomainError::invariant("password hash is missing"));
        }

        Ok(vec![AccountEvent::Registered(AccountRegistered {
            account_id: cmd.account_id,
            email,
            display_name,
            password_hash: cmd.password_hash.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &AccountAction) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_target(cmd.account_id)?;

        // Already approved: nothing to record, roles stay as they are.
        if self.is_approved {
            return Ok(vec![]);
        }

        Ok(vec![AccountEvent::Approved(AccountApproved {
            account_id: cmd.account_id,
            roles: BTreeSet::from([Role::USER]),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_disapprove(&self, cmd: &AccountAction) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_target(cmd.account_id)?;

        if !self.is_approved {
            return Ok(vec![]);
        }

        Ok(vec![AccountEvent::Disapproved(AccountDisapproved {
            account_id: cmd.account_id,
            cleared_revocation: self.is_revoked,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_toggle_approval(&self, cmd: &AccountAction) -> Result<Vec<AccountEvent>, DomainError> {
        if self.is_approved {
            self.handle_disapprove(cmd)
        } else {
            self.handle_approve(cmd)
        }
    }

    fn handle_toggle_revoke(&self, cmd: &AccountAction) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_target(cmd.account_id)?;

        // Revocation acts on granted access only; unapproved accounts are left alone.
        if !self.is_approved {
            return Ok(vec![]);
        }

        let event = if self.is_revoked {
            AccountEvent::Restored(AccountRestored {
                account_id: cmd.account_id,
                occurred_at: cmd.occurred_at,
            })
        } else {
            AccountEvent::Revoked(AccountRevoked {
                account_id: cmd.account_id,
                occurred_at: cmd.occurred_at,
            })
        };
        Ok(vec![event])
    }

    fn handle_change_password(&self, cmd: &ChangePassword) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_target(cmd.account_id)?;

        if cmd.password_hash.is_empty() {
            return Err(DomainError::invariant("password hash is missing"));
        }

        Ok(vec![AccountEvent::PasswordChanged(PasswordChanged {
            account_id: cmd.account_id,
            password_hash: cmd.password_hash.clone(),
            credential_version: self.credential_version.wrapping_add(1),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_profile(&self, cmd: &UpdateProfile) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_target(cmd.account_id)?;

        if !self.is_approved {
            return Err(DomainError::forbidden("account must be approved first"));
        }

        let display_name = normalize_display_name(&cmd.display_name)?;

        Ok(vec![AccountEvent::ProfileUpdated(ProfileUpdated {
            account_id: cmd.account_id,
            display_name,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_details(&self, cmd: &ChangeDetails) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_target(cmd.account_id)?;

        let email = normalize_email(&cmd.email)?;
        let display_name = normalize_display_name(&cmd.display_name)?;
        if email == self.email && display_name == self.display_name {
            return Ok(vec![]);
        }

        Ok(vec![AccountEvent::DetailsChanged(DetailsChanged {
            account_id: cmd.account_id,
            email,
            display_name,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_roles(&self, cmd: &AssignRoles) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_target(cmd.account_id)?;

        if !self.is_approved {
            return Err(DomainError::invariant(
                "roles can only be assigned to approved accounts",
            ));
        }
        if cmd.roles.is_empty() {
            return Err(DomainError::validation("at least one role is required"));
        }
        if let Some(role) = cmd.roles.iter().find(|r| !r.is_assignable()) {
            return Err(DomainError::validation(format!("role '{role}' cannot be assigned")));
        }
        if cmd.roles == self.roles {
            return Ok(vec![]);
        }

        Ok(vec![AccountEvent::RolesAssigned(RolesAssigned {
            account_id: cmd.account_id,
            roles: cmd.roles.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Event Appliers
    // ─────────────────────────────────────────────────────────────────────────

    fn apply_registered(&mut self, e: &AccountRegistered) {
        self.id = e.account_id;
        self.email = e.email.clone();
        self.display_name = e.display_name.clone();
        self.password_hash = e.password_hash.clone();
        self.roles = BTreeSet::from([Role::PENDING]);
        self.is_approved = false;
        self.is_revoked = false;
        self.credential_version = 0;
        self.created_at = e.occurred_at;
        self.created = true;
    }

    fn apply_approved(&mut self, e: &AccountApproved) {
        self.is_approved = true;
        self.roles = e.roles.clone();
    }

    fn apply_disapproved(&mut self, _e: &AccountDisapproved) {
        self.is_approved = false;
        self.is_revoked = false;
    }

    fn apply_revoked(&mut self, _e: &AccountRevoked) {
        self.is_revoked = true;
    }

    fn apply_restored(&mut self, _e: &AccountRestored) {
        self.is_revoked = false;
    }

    fn apply_password_changed(&mut self, e: &PasswordChanged) {
        self.password_hash = e.password_hash.clone();
        self.credential_version = e.credential_version;
    }

    fn apply_profile_updated(&mut self, e: &ProfileUpdated) {
        self.display_name = e.display_name.clone();
    }

    fn apply_details_changed(&mut self, e: &DetailsChanged) {
        self.email = e.email.clone();
        self.display_name = e.display_name.clone();
    }

    fn apply_roles_assigned(&mut self, e: &RolesAssigned) {
        self.roles = e.roles.clone();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn action(account: &Account) -> AccountAction {
        AccountAction {
            account_id: account.id,
            occurred_at: now(),
        }
    }

    fn registered(email: &str) -> Account {
        let id = AccountId::new();
        let mut account = Account::empty(id);
        let cmd = AccountCommand::Register(RegisterAccount {
            account_id: id,
            email: email.to_string(),
            display_name: "Alice".to_string(),
            password_hash: PasswordHash::new("plain$correct horse"),
            occurred_at: now(),
        });
        account.execute(&cmd).unwrap();
        account
    }

    #[test]
    fn register_starts_pending() {
        let account = registered("  Alice@Example.COM ");

        assert_eq!(account.email, "alice@example.com");
        assert_eq!(account.roles, BTreeSet::from([Role::PENDING]));
        assert!(!account.is_approved);
        assert!(!account.is_revoked);
        assert_eq!(account.lifecycle_state(), LifecycleState::Pending);
        assert_eq!(account.version, 1);
    }

    #[test]
    fn register_rejects_bad_input() {
        let id = AccountId::new();
        let account = Account::empty(id);

        let cmd = AccountCommand::Register(RegisterAccount {
            account_id: id,
            email: "invalid-email".to_string(),
            display_name: "Alice".to_string(),
            password_hash: PasswordHash::new("plain$x"),
            occurred_at: now(),
        });
        assert!(matches!(account.handle(&cmd), Err(DomainError::Validation(_))));

        let cmd = AccountCommand::Register(RegisterAccount {
            account_id: id,
            email: "a@x.com".to_string(),
            display_name: "   ".to_string(),
            password_hash: PasswordHash::new("plain$x"),
            occurred_at: now(),
        });
        assert!(matches!(account.handle(&cmd), Err(DomainError::Validation(_))));
    }

    #[test]
    fn register_twice_conflicts() {
        let account = registered("a@x.com");
        let cmd = AccountCommand::Register(RegisterAccount {
            account_id: account.id,
            email: "a@x.com".to_string(),
            display_name: "Alice".to_string(),
            password_hash: PasswordHash::new("plain$x"),
            occurred_at: now(),
        });
        assert!(matches!(account.handle(&cmd), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn email_shapes() {
        assert!(normalize_email("a@x.com").is_ok());
        assert!(normalize_email("first.last@sub.example.org").is_ok());
        assert!(normalize_email("a@x").is_err());
        assert!(normalize_email("@x.com").is_err());
        assert!(normalize_email("a@@x.com").is_err());
        assert!(normalize_email("a@x..com").is_err());
        assert!(normalize_email("a b@x.com").is_err());
        assert!(normalize_email("").is_err());
    }

    #[test]
    fn approve_replaces_roles_with_user() {
        let mut account = registered("a@x.com");
        let events = account.execute(&AccountCommand::Approve(action(&account))).unwrap();

        assert_eq!(events.len(), 1);
        assert!(account.is_approved);
        assert_eq!(account.roles, BTreeSet::from([Role::USER]));
    }

    #[test]
    fn approve_twice_emits_nothing_the_second_time() {
        let mut account = registered("a@x.com");
        account.execute(&AccountCommand::Approve(action(&account))).unwrap();
        let version = account.version;

        let events = account.execute(&AccountCommand::Approve(action(&account))).unwrap();

        assert!(events.is_empty());
        assert_eq!(account.version, version);
    }

    #[test]
    fn disapprove_keeps_roles_and_clears_revocation() {
        let mut account = registered("a@x.com");
        account.execute(&AccountCommand::Approve(action(&account))).unwrap();
        account.execute(&AccountCommand::ToggleRevoke(action(&account))).unwrap();
        assert_eq!(account.lifecycle_state(), LifecycleState::Revoked);

        let events = account.execute(&AccountCommand::Disapprove(action(&account))).unwrap();

        let AccountEvent::Disapproved(e) = &events[0] else {
            panic!("expected Disapproved event");
        };
        assert!(e.cleared_revocation);
        assert!(!account.is_approved);
        assert!(!account.is_revoked);
        assert_eq!(account.roles, BTreeSet::from([Role::USER]));
    }

    #[test]
    fn toggle_revoke_ignores_unapproved_accounts() {
        let mut account = registered("a@x.com");
        let events = account.execute(&AccountCommand::ToggleRevoke(action(&account))).unwrap();

        assert!(events.is_empty());
        assert!(!account.is_revoked);
    }

    #[test]
    fn update_profile_requires_approval() {
        let account = registered("a@x.com");
        let cmd = AccountCommand::UpdateProfile(UpdateProfile {
            account_id: account.id,
            display_name: "Bob".to_string(),
            occurred_at: now(),
        });

        assert!(matches!(account.handle(&cmd), Err(DomainError::Forbidden(_))));
    }

    #[test]
    fn change_password_bumps_credential_version() {
        let mut account = registered("a@x.com");
        let cmd = AccountCommand::ChangePassword(ChangePassword {
            account_id: account.id,
            password_hash: PasswordHash::new("plain$new secret"),
            occurred_at: now(),
        });
        account.execute(&cmd).unwrap();

        assert_eq!(account.credential_version, 1);
        assert_eq!(account.password_hash.as_str(), "plain$new secret");
    }

    #[test]
    fn assign_roles_rules() {
        let mut account = registered("a@x.com");
        let assign = |account: &Account, roles: &[Role]| {
            AccountCommand::AssignRoles(AssignRoles {
                account_id: account.id,
                roles: roles.iter().cloned().collect(),
                occurred_at: now(),
            })
        };

        assert!(matches!(
            account.handle(&assign(&account, &[Role::ADMIN])),
            Err(DomainError::InvariantViolation(_))
        ));

        account.execute(&AccountCommand::Approve(action(&account))).unwrap();

        assert!(matches!(
            account.handle(&assign(&account, &[])),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            account.handle(&assign(&account, &[Role::PENDING])),
            Err(DomainError::Validation(_))
        ));

        account.execute(&assign(&account, &[Role::USER, Role::ADMIN])).unwrap();
        assert!(account.is_admin());
    }

    #[test]
    fn toggle_approval_command_flips_approval() {
        let mut account = registered("a@x.com");

        account.execute(&AccountCommand::ToggleApproval(action(&account))).unwrap();
        assert_eq!(account.lifecycle_state(), LifecycleState::Approved);
        assert_eq!(account.roles, BTreeSet::from([Role::USER]));

        account.execute(&AccountCommand::ToggleRevoke(action(&account))).unwrap();
        account.execute(&AccountCommand::ToggleApproval(action(&account))).unwrap();
        assert_eq!(account.lifecycle_state(), LifecycleState::Pending);
    }

    #[test]
    fn change_details_normalises_and_skips_unchanged_values() {
        let mut account = registered("a@x.com");
        let details = |account: &Account, email: &str, name: &str| {
            AccountCommand::ChangeDetails(ChangeDetails {
                account_id: account.id,
                email: email.to_string(),
                display_name: name.to_string(),
                occurred_at: now(),
            })
        };

        let events = account.execute(&details(&account, " B@X.com ", " Bob ")).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(account.email, "b@x.com");
        assert_eq!(account.display_name, "Bob");
        assert!(!account.is_approved);

        assert!(account.handle(&details(&account, "b@x.com", "Bob")).unwrap().is_empty());
        assert!(matches!(
            account.handle(&details(&account, "nope", "Bob")),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn commands_on_unknown_account_are_not_found() {
        let account = Account::empty(AccountId::new());
        let result = account.handle(&AccountCommand::Approve(action(&account)));
        assert_eq!(result, Err(DomainError::NotFound));
    }

    #[test]
    fn commands_for_another_account_are_rejected() {
        let account = registered("a@x.com");
        let cmd = AccountCommand::Approve(AccountAction {
            account_id: AccountId::new(),
            occurred_at: now(),
        });
        let err = account.handle(&cmd).unwrap_err();
        assert!(err.to_string().contains("account_id mismatch"));
    }
}
