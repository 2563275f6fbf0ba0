//! API error type and its JSON rendering.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use nestegg_core::StoreError;
use nestegg_core::auth::{AuthError, OAuthError};
use nestegg_core::ledger::LedgerError;
use nestegg_shared::JwtError;
use serde::Serialize;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Machine-readable code.
    pub code: &'static str,
}

/// An error ready to be sent to the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

/// API result type.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn new(status: u16, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code,
            message: message.into(),
        }
    }

    /// 401 with the given code.
    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(401, code, message)
    }

    /// 404 `not_found`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, "not_found", message)
    }

    /// 500 that hides `detail` from the client and logs it instead.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!(error = %detail, "request failed");
        Self::new(500, "internal_error", INTERNAL_MESSAGE)
    }

    /// Returns the HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if matches!(err, AuthError::Password(_)) {
            return Self::internal(err);
        }
        Self::new(err.http_status_code(), err.error_code(), err.to_string())
    }
}

impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        tracing::warn!(code = err.error_code(), error = %err, "external login failed");
        Self::new(err.http_status_code(), err.error_code(), err.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        if matches!(err, LedgerError::Database(_)) {
            return Self::internal(err);
        }
        Self::new(err.http_status_code(), err.error_code(), err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Backend(_) => Self::internal(err),
            other => Self::new(other.http_status_code(), other.error_code(), other.to_string()),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingError(_) => Self::internal(err),
            JwtError::Expired => Self::unauthorized(err.error_code(), "Token has expired"),
            JwtError::DecodingError(_) => {
                Self::unauthorized(err.error_code(), "Invalid or malformed token")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(400, "validation_error", rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LedgerError::MissingRequired, 400, "validation_error")]
    #[case(LedgerError::TransactionNotFound, 404, "not_found")]
    #[case(LedgerError::DuplicateCategory("Food".into()), 409, "conflict")]
    #[case(LedgerError::Database("boom".into()), 500, "internal_error")]
    fn test_ledger_error_mapping(
        #[case] err: LedgerError,
        #[case] status: u16,
        #[case] code: &str,
    ) {
        let api: ApiError = err.into();
        assert_eq!(api.status().as_u16(), status);
        assert_eq!(api.code(), code);
    }

    #[test]
    fn test_backend_failure_hides_detail() {
        let api: ApiError = StoreError::Backend("connection refused on 10.0.0.3".into()).into();
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message, INTERNAL_MESSAGE);
    }

    #[test]
    fn test_store_conflict_keeps_message() {
        let api: ApiError = StoreError::Conflict("user already exists".into()).into();
        assert_eq!(api.status(), StatusCode::CONFLICT);
        assert_eq!(api.message, "user already exists");
    }

    #[rstest]
    #[case(JwtError::Expired, "token_expired")]
    #[case(JwtError::DecodingError("bad".into()), "invalid_token")]
    fn test_jwt_errors_are_unauthorized(#[case] err: JwtError, #[case] code: &str) {
        let api: ApiError = err.into();
        assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(api.code(), code);
    }
}
