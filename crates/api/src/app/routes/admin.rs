//! Admin routes for the approval workflow.
//!
//! Mounted behind the admin gate; the service re-checks the actor and refuses
//! self-targeting on every call.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
};

use accountdesk_auth::{Account, Transition};
use accountdesk_core::AccountId;
use accountdesk_infra::{AccountFilter, ServiceError};

use crate::app::dto::{self, AdminAccountView, AssignRolesRequest, EditAccountRequest, FlashResponse};
use crate::app::{errors, services::{self, AppServices}};
use crate::context::SessionContext;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/accounts", get(list_accounts))
        .route("/accounts/:id", get(get_account).put(edit_account))
        .route("/accounts/:id/approve", post(approve))
        .route("/accounts/:id/disapprove", post(disapprove))
        .route("/accounts/:id/toggle-approval", post(toggle_approval))
        .route("/accounts/:id/toggle-revoke", post(toggle_revoke))
        .route("/accounts/:id/roles", put(assign_roles))
}

// ─────────────────────────────────────────────────────────────────────────────
// Queries
// ─────────────────────────────────────────────────────────────────────────────

/// GET /admin/accounts - every account except the caller, with row actions.
pub async fn list_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Query(filter): Query<AccountFilter>,
) -> axum::response::Response {
    match services.accounts.list(session.account(), &filter) {
        Ok(accounts) => {
            let rows: Vec<AdminAccountView> = accounts.iter().map(AdminAccountView::from).collect();
            (
                StatusCode::OK,
                Json(serde_json::json!({ "count": rows.len(), "accounts": rows })),
            )
                .into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /admin/accounts/:id
pub async fn get_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let account_id = match dto::parse_account_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.accounts.get(session.account(), account_id) {
        Ok(account) => (StatusCode::OK, Json(AdminAccountView::from(&account))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle actions
// ─────────────────────────────────────────────────────────────────────────────

/// POST /admin/accounts/:id/approve
pub async fn approve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> axum::response::Response {
    run_action(&services, &session, &headers, &id, |s, actor, id| s.accounts.approve(actor, id)).await
}

/// POST /admin/accounts/:id/disapprove
pub async fn disapprove(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> axum::response::Response {
    run_action(&services, &session, &headers, &id, |s, actor, id| {
        s.accounts.disapprove(actor, id)
    })
    .await
}

/// POST /admin/accounts/:id/toggle-approval
pub async fn toggle_approval(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> axum::response::Response {
    run_action(&services, &session, &headers, &id, |s, actor, id| {
        s.accounts.toggle_approval(actor, id)
    })
    .await
}

/// POST /admin/accounts/:id/toggle-revoke
pub async fn toggle_revoke(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> axum::response::Response {
    run_action(&services, &session, &headers, &id, |s, actor, id| {
        s.accounts.toggle_revoke(actor, id)
    })
    .await
}

/// PUT /admin/accounts/:id - edit email, display name and optionally reset
/// the password.
pub async fn edit_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<EditAccountRequest>,
) -> axum::response::Response {
    run_action(&services, &session, &headers, &id, move |s, actor, id| {
        s.accounts
            .edit_account(actor, id, &body.email, &body.display_name, body.password.as_deref())
    })
    .await
}

/// PUT /admin/accounts/:id/roles
pub async fn assign_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<AssignRolesRequest>,
) -> axum::response::Response {
    let roles = match dto::parse_roles(&body.roles) {
        Ok(roles) => roles,
        Err(resp) => return resp,
    };

    run_action(&services, &session, &headers, &id, move |s, actor, id| {
        s.accounts.assign_roles(actor, id, roles)
    })
    .await
}

async fn run_action<F>(
    services: &Arc<AppServices>,
    session: &SessionContext,
    headers: &HeaderMap,
    raw_id: &str,
    action: F,
) -> axum::response::Response
where
    F: FnOnce(&AppServices, &Account, AccountId) -> Result<(Account, Transition), ServiceError>
        + Send
        + 'static,
{
    let account_id = match dto::parse_account_id(raw_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let redirect_to = services.redirects.from_headers(headers);

    let actor = session.account().clone();
    let result = services::run_blocking(services, move |s| {
        action(s, &actor, account_id).map_err(errors::service_error_to_response)
    })
    .await;

    let (account, transition) = match result {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    (
        StatusCode::OK,
        Json(FlashResponse {
            body: serde_json::json!({ "account": AdminAccountView::from(&account) }),
            flash: transition.flash,
            redirect_to,
        }),
    )
        .into_response()
}
