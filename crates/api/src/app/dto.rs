use std::collections::BTreeSet;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use accountdesk_auth::{Account, AdminAction, Flash, LifecycleState, Role, available_actions};
use accountdesk_core::AccountId;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: String,
    /// Empty or absent keeps the current password.
    pub password: Option<String>,
}

/// Admin edit of another account.
#[derive(Debug, Deserialize)]
pub struct EditAccountRequest {
    pub email: String,
    pub display_name: String,
    /// Empty or absent keeps the current password.
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRolesRequest {
    pub roles: Vec<String>,
}

// -------------------------
// Response DTOs
// -------------------------

/// Public view of an account. Never includes credential material.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: AccountId,
    pub email: String,
    pub display_name: String,
    pub roles: Vec<String>,
    pub is_approved: bool,
    pub is_revoked: bool,
    pub state: LifecycleState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            display_name: account.display_name.clone(),
            roles: account.roles.iter().map(|r| r.as_str().to_string()).collect(),
            is_approved: account.is_approved,
            is_revoked: account.is_revoked,
            state: account.lifecycle_state(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Row of the admin listing: the account plus the actions offered for it.
#[derive(Debug, Clone, Serialize)]
pub struct AdminAccountView {
    #[serde(flatten)]
    pub account: AccountView,
    pub actions: Vec<AdminAction>,
}

impl From<&Account> for AdminAccountView {
    fn from(account: &Account) -> Self {
        Self {
            account: AccountView::from(account),
            actions: available_actions(account),
        }
    }
}

/// Result of a mutating request: what to show, and where to go next.
#[derive(Debug, Clone, Serialize)]
pub struct FlashResponse<T> {
    #[serde(flatten)]
    pub body: T,
    pub flash: Flash,
    pub redirect_to: String,
}

// -------------------------
// Parsing helpers
// -------------------------

pub fn parse_account_id(raw: &str) -> Result<AccountId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid account id"))
}

/// Resolve role names; unknown names are rejected rather than ignored.
pub fn parse_roles(raw: &[String]) -> Result<BTreeSet<Role>, axum::response::Response> {
    raw.iter()
        .map(|name| {
            Role::known(name).ok_or_else(|| {
                errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_role",
                    format!("unknown role '{name}'"),
                )
            })
        })
        .collect()
}
