use axum::{
    Router,
    routing::{get, post},
};

pub mod admin;
pub mod profile;
pub mod registration;
pub mod session;
pub mod system;

/// Endpoints reachable without a session.
pub fn public_router() -> Router {
    Router::new()
        .route("/register", post(registration::register))
        .route("/login", post(session::login))
}

/// Endpoints that need a valid session (any lifecycle state).
pub fn session_router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/profile", get(profile::show).post(profile::update))
}
