//! `accountdesk-auth`: account lifecycle and authentication boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: the store and
//! the password hashing primitive are ports implemented elsewhere.

pub mod account;
pub mod authorize;
pub mod claims;
pub mod flash;
pub mod gate;
pub mod jwt;
pub mod lifecycle;
pub mod password;
pub mod roles;

pub use account::{
    Account, AccountAction, AccountCommand, AccountEvent, AssignRoles, ChangeDetails, ChangePassword,
    LifecycleState, RegisterAccount, UpdateProfile, normalize_email,
};
pub use authorize::{ensure_not_self, require_admin};
pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use flash::{Flash, FlashKind};
pub use gate::{AuthError, authenticate, check_session};
pub use jwt::{Hs256Jwt, JwtError, JwtIssuer, JwtValidator};
pub use lifecycle::{AccountLifecycle, AdminAction, LifecycleError, Transition, available_actions};
pub use password::{PasswordError, PasswordHash, PasswordHasher, validate_password};
pub use roles::Role;
