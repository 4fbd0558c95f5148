//! Self-service profile page. Only approved accounts may use it; everyone
//! else is sent home with a warning.

use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};

use accountdesk_auth::{Flash, lifecycle::messages};
use accountdesk_infra::ServiceError;

use crate::app::dto::{AccountView, FlashResponse, UpdateProfileRequest};
use crate::app::routes::{registration::LOGIN_PATH, session::HOME_PATH};
use crate::app::{errors, services::{self, AppServices}};
use crate::context::SessionContext;

pub const PROFILE_PATH: &str = "/profile";

/// GET /profile
pub async fn show(Extension(session): Extension<SessionContext>) -> axum::response::Response {
    if !session.account().is_approved {
        return approval_required();
    }

    (StatusCode::OK, Json(AccountView::from(session.account()))).into_response()
}

/// POST /profile - rename, optionally with a new password.
pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<UpdateProfileRequest>,
) -> axum::response::Response {
    let account_id = session.account_id();
    let result = services::run_blocking(&services, move |s| {
        s.accounts
            .update_profile(account_id, &body.display_name, body.password.as_deref())
            .map_err(|e| match e {
                ServiceError::Forbidden(_) => approval_required(),
                other => errors::service_error_to_response(other),
            })
    })
    .await;

    let (account, transition) = match result {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    // A new password ends this session; the client has to log in again.
    let redirect_to = if transition.requires_relog() { LOGIN_PATH } else { PROFILE_PATH };

    (
        StatusCode::OK,
        Json(FlashResponse {
            body: serde_json::json!({ "account": AccountView::from(&account) }),
            flash: transition.flash,
            redirect_to: redirect_to.to_string(),
        }),
    )
        .into_response()
}

fn approval_required() -> axum::response::Response {
    (
        StatusCode::FORBIDDEN,
        Json(FlashResponse {
            body: serde_json::json!({
                "error": "forbidden",
                "message": messages::APPROVAL_REQUIRED,
            }),
            flash: Flash::warning(messages::APPROVAL_REQUIRED),
            redirect_to: HOME_PATH.to_string(),
        }),
    )
        .into_response()
}
