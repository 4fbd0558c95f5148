use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use chrono::Duration;
use tokio::task::JoinHandle;

use accountdesk_auth::{AccountEvent, Hs256Jwt};
use accountdesk_events::{Event, EventBus, EventEnvelope, InMemoryEventBus};
use accountdesk_infra::{AccountService, Argon2PasswordHasher, InMemoryAccountStore, ServiceError};

use crate::app::{errors, redirect::RedirectResolver};
use crate::config::ApiConfig;

pub type AccountBus = InMemoryEventBus<EventEnvelope<AccountEvent>>;

pub type AppAccountService =
    AccountService<Arc<InMemoryAccountStore>, Arc<Argon2PasswordHasher>, Arc<AccountBus>>;

/// Everything handlers need, shared behind one `Arc`.
pub struct AppServices {
    pub accounts: AppAccountService,
    pub jwt: Hs256Jwt,
    pub session_ttl: Duration,
    pub redirects: RedirectResolver,
}

/// In-memory wiring: store + hasher + bus, audit subscriber, bootstrap admin.
pub fn build_services(config: &ApiConfig) -> Result<AppServices, ServiceError> {
    let store = Arc::new(InMemoryAccountStore::new());
    let hasher = Arc::new(Argon2PasswordHasher::new(config.argon2)?);
    let bus: Arc<AccountBus> = Arc::new(InMemoryEventBus::new());

    // Detached: the task ends on its own once the bus is dropped.
    let _audit = spawn_audit_subscriber(&bus);

    let accounts = AccountService::new(store, hasher, bus)?;

    if let Some(admin) = &config.bootstrap_admin {
        accounts.bootstrap_admin(&admin.email, &admin.display_name, &admin.password)?;
    }

    Ok(AppServices {
        accounts,
        jwt: Hs256Jwt::new(config.jwt_secret.as_bytes()),
        session_ttl: config.session_ttl,
        redirects: RedirectResolver::default(),
    })
}

/// Background subscriber: bus -> audit log. Ends when the bus is dropped and
/// yields the number of envelopes it logged.
fn spawn_audit_subscriber(bus: &AccountBus) -> JoinHandle<usize> {
    let sub = bus.subscribe();
    tokio::task::spawn_blocking(move || {
        let mut logged = 0;
        while let Ok(envelope) = sub.recv() {
            tracing::info!(
                target: "audit",
                audit = true,
                event_id = %envelope.event_id(),
                event_type = envelope.payload().event_type(),
                account_id = %envelope.aggregate_id(),
                sequence_number = envelope.sequence_number(),
                occurred_at = %envelope.payload().occurred_at(),
                "account event"
            );
            logged += 1;
        }
        logged
    })
}

/// Run service work off the async workers (password hashing is CPU heavy).
pub async fn run_blocking<T, F>(services: &Arc<AppServices>, work: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce(&AppServices) -> Result<T, Response> + Send + 'static,
{
    let services = Arc::clone(services);
    match tokio::task::spawn_blocking(move || work(&services)).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "blocking task failed");
            Err(errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "request could not be completed",
            ))
        }
    }
}
