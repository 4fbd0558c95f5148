//! HTTP API application wiring (Axum router + service wiring).
//!
//! Layout:
//! - `services.rs`: infrastructure wiring (store, hasher, bus, audit subscriber)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses
//! - `redirect.rs`: post-action redirect target

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use accountdesk_infra::ServiceError;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod redirect;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Must run inside a Tokio runtime: the audit subscriber is spawned here.
pub async fn build_app(config: ApiConfig) -> Result<Router, ServiceError> {
    let services = Arc::new(services::build_services(&config)?);
    let auth_state = middleware::AuthState {
        services: services.clone(),
    };

    let admin = routes::admin::router().route_layer(axum::middleware::from_fn(middleware::admin_middleware));

    // Session routes: require a valid bearer token for a live account.
    let protected = routes::session_router()
        .nest("/admin", admin)
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::public_router())
        .merge(protected)
        .layer(Extension(services))
        .layer(ServiceBuilder::new()))
}
