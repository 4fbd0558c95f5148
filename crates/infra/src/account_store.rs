//! Account persistence port and its in-memory adapter.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use accountdesk_auth::Account;
use accountdesk_core::AccountId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Another account already uses this (normalised) email.
    #[error("email '{0}' is already registered")]
    DuplicateEmail(String),

    /// Internal lock poisoning.
    #[error("account store is unavailable")]
    Poisoned,
}

/// Where accounts live. Saving replaces the whole record (last write wins).
pub trait AccountStore: Send + Sync {
    fn find(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Lookup by normalised email.
    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Insert or replace. Fails if the email belongs to a different account.
    fn save(&self, account: &Account) -> Result<(), StoreError>;

    /// All accounts, oldest first.
    fn list(&self) -> Result<Vec<Account>, StoreError>;
}

impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    fn find(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        (**self).find(id)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        (**self).find_by_email(email)
    }

    fn save(&self, account: &Account) -> Result<(), StoreError> {
        (**self).save(account)
    }

    fn list(&self) -> Result<Vec<Account>, StoreError> {
        (**self).list()
    }
}

/// In-memory account store for the single-process deployment and tests.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    inner: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn find(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(&id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.values().find(|a| a.email.eq_ignore_ascii_case(email)).cloned())
    }

    fn save(&self, account: &Account) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;

        let taken = map
            .values()
            .any(|a| a.id != account.id && a.email.eq_ignore_ascii_case(&account.email));
        if taken {
            return Err(StoreError::DuplicateEmail(account.email.clone()));
        }

        map.insert(account.id, account.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Account>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let mut accounts: Vec<Account> = map.values().cloned().collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(email: &str) -> Account {
        let mut account = Account::empty(AccountId::new());
        account.email = email.to_string();
        account.created = true;
        account
    }

    #[test]
    fn save_then_find_by_id_and_email() {
        let store = InMemoryAccountStore::new();
        let a = account("a@x.com");
        store.save(&a).unwrap();

        assert_eq!(store.find(a.id).unwrap(), Some(a.clone()));
        assert_eq!(store.find_by_email("A@X.com").unwrap(), Some(a));
        assert_eq!(store.find_by_email("b@x.com").unwrap(), None);
    }

    #[test]
    fn saving_same_account_twice_replaces_it() {
        let store = InMemoryAccountStore::new();
        let mut a = account("a@x.com");
        store.save(&a).unwrap();

        a.display_name = "Renamed".to_string();
        store.save(&a).unwrap();

        assert_eq!(store.list().unwrap().len(), 1);
        assert_eq!(store.find(a.id).unwrap().unwrap().display_name, "Renamed");
    }

    #[test]
    fn email_is_unique_across_accounts() {
        let store = InMemoryAccountStore::new();
        store.save(&account("a@x.com")).unwrap();

        assert_eq!(
            store.save(&account("a@x.com")),
            Err(StoreError::DuplicateEmail("a@x.com".to_string()))
        );
    }

    #[test]
    fn list_is_ordered_by_creation() {
        let store = InMemoryAccountStore::new();
        let mut first = account("first@x.com");
        first.created_at = chrono::Utc::now() - chrono::Duration::minutes(5);
        let second = {
            let mut a = account("second@x.com");
            a.created_at = chrono::Utc::now();
            a
        };
        store.save(&second).unwrap();
        store.save(&first).unwrap();

        let emails: Vec<_> = store.list().unwrap().into_iter().map(|a| a.email).collect();
        assert_eq!(emails, vec!["first@x.com", "second@x.com"]);
    }
}
