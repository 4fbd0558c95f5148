use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role token carried by an account.
///
/// Roles are opaque strings so the set can grow without a schema change. In
/// practice an account holds one of [`Role::PENDING`], [`Role::USER`] or
/// [`Role::ADMIN`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Registered but not yet approved.
    pub const PENDING: Role = Role(Cow::Borrowed("PENDING"));
    /// Approved regular account.
    pub const USER: Role = Role(Cow::Borrowed("USER"));
    /// Administrator: may run the approval workflow on other accounts.
    pub const ADMIN: Role = Role(Cow::Borrowed("ADMIN"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Resolve one of the well-known role names (case-insensitive).
    pub fn known(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::PENDING),
            "USER" => Some(Self::USER),
            "ADMIN" => Some(Self::ADMIN),
            _ => None,
        }
    }

    /// Roles an administrator may hand out through role assignment.
    pub fn is_assignable(&self) -> bool {
        *self == Self::USER || *self == Self::ADMIN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
