use accountdesk_auth::{Account, SessionClaims};
use accountdesk_core::AccountId;

/// Authenticated session for a request.
///
/// Inserted by the auth middleware after the token and the stored account
/// have both been checked; the account is as fresh as the store.
#[derive(Debug, Clone)]
pub struct SessionContext {
    account: Account,
    claims: SessionClaims,
}

impl SessionContext {
    pub fn new(account: Account, claims: SessionClaims) -> Self {
        Self { account, claims }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn account_id(&self) -> AccountId {
        self.account.id
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }
}
