use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use accountdesk_auth::{JwtValidator, require_admin};

use crate::app::{errors, services::AppServices};
use crate::context::SessionContext;

#[derive(Clone)]
pub struct AuthState {
    pub services: Arc<AppServices>,
}

/// Bearer token -> verified claims -> current account -> `SessionContext`.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(req.headers()) else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing bearer token");
    };

    let claims = match state.services.jwt.validate(token, Utc::now()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "bearer token rejected");
            return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid or expired token");
        }
    };

    let account = match state.services.accounts.session_account(&claims) {
        Ok(account) => account,
        Err(e) => return errors::service_error_to_response(e),
    };

    req.extensions_mut().insert(SessionContext::new(account, claims));

    next.run(req).await
}

/// Gate for `/admin/*`: the session account must be an active admin.
pub async fn admin_middleware(
    Extension(session): Extension<SessionContext>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Err(e) = require_admin(session.account()) {
        tracing::warn!(account_id = %session.account_id(), "admin route refused");
        return errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string());
    }

    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let token = header.to_str().ok()?.strip_prefix("Bearer ")?.trim();

    if token.is_empty() {
        return None;
    }
    Some(token)
}
