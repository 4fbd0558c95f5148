//! Infrastructure layer: account storage, password hashing and the
//! application service that ties them to the event bus.

pub mod account_service;
pub mod account_store;
pub mod password;

pub use account_service::{ACCOUNT_AGGREGATE_TYPE, AccountFilter, AccountService, ServiceError};
pub use account_store::{AccountStore, InMemoryAccountStore, StoreError};
pub use password::{Argon2Cost, Argon2PasswordHasher};
