use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::dto::{FlashResponse, RegisterRequest};
use crate::app::{errors, services::{self, AppServices}};

pub const LOGIN_PATH: &str = "/login";

/// POST /register - self-service sign-up; the account starts pending.
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RegisterRequest>,
) -> axum::response::Response {
    let result = services::run_blocking(&services, move |s| {
        s.accounts
            .register(&body.email, &body.display_name, &body.password)
            .map_err(errors::service_error_to_response)
    })
    .await;

    let (account, flash) = match result {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    (
        StatusCode::CREATED,
        Json(FlashResponse {
            body: serde_json::json!({ "id": account.id }),
            flash,
            redirect_to: LOGIN_PATH.to_string(),
        }),
    )
        .into_response()
}
