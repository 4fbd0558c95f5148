use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use accountdesk_auth::{AuthError, PasswordError};
use accountdesk_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        ServiceError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "account not found"),
        ServiceError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        ServiceError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        ServiceError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ServiceError::Auth(e) => auth_error_to_response(e),
        ServiceError::Password(e @ (PasswordError::TooShort { .. } | PasswordError::TooLong { .. })) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
        }
        ServiceError::Password(e) => {
            tracing::error!(error = %e, "password backend failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "password_error", "password could not be processed")
        }
        ServiceError::Store(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string()),
        ServiceError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
    }
}

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        AuthError::InvalidCredentials => json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", message),
        AuthError::PendingApproval => json_error(StatusCode::FORBIDDEN, "pending_approval", message),
        AuthError::Revoked => json_error(StatusCode::FORBIDDEN, "account_revoked", message),
        AuthError::SessionExpired => json_error(StatusCode::UNAUTHORIZED, "session_expired", message),
        AuthError::Password(e) => service_error_to_response(ServiceError::Password(e)),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (ServiceError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::NotFound, StatusCode::NOT_FOUND),
            (ServiceError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ServiceError::InvariantViolation("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::Auth(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED),
            (ServiceError::Auth(AuthError::PendingApproval), StatusCode::FORBIDDEN),
            (ServiceError::Auth(AuthError::Revoked), StatusCode::FORBIDDEN),
            (ServiceError::Password(PasswordError::TooShort { min: 8 }), StatusCode::BAD_REQUEST),
            (ServiceError::Password(PasswordError::InvalidHashFormat), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(service_error_to_response(err).status(), status);
        }
    }
}
