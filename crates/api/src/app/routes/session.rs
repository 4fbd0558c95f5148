use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use accountdesk_auth::{JwtIssuer, SessionClaims};

use crate::app::dto::LoginRequest;
use crate::app::{errors, services::{self, AppServices}};

pub const HOME_PATH: &str = "/";

/// POST /login - exchange credentials for a session token.
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> axum::response::Response {
    let result = services::run_blocking(&services, move |s| {
        s.accounts
            .authenticate(&body.email, &body.password)
            .map_err(errors::service_error_to_response)
    })
    .await;

    let account = match result {
        Ok(account) => account,
        Err(resp) => return resp,
    };

    let claims = SessionClaims::for_account(&account, Utc::now(), services.session_ttl);
    let token = match services.jwt.issue(&claims) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "session token could not be issued");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "token_error",
                "session could not be created",
            );
        }
    };

    tracing::info!(account_id = %account.id, "login succeeded");

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "token": token,
            "expires_at": claims.expires_at,
            "redirect_to": HOME_PATH,
        })),
    )
        .into_response()
}
