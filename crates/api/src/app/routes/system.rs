use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::dto::AccountView;
use crate::context::SessionContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(session): Extension<SessionContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "account": AccountView::from(session.account()),
        "session_expires_at": session.claims().expires_at,
    }))
}
