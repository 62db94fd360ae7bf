//! HTTP error responses.
//!
//! Every failed request gets the same body:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "not found: document 42" } }
//! ```
//!
//! | Code | Status | Cause |
//! |------|--------|-------|
//! | `bad_request` | 400 | invalid input |
//! | `provider_disabled` | 400 | embedding or completion provider disabled |
//! | `not_found` | 404 | unknown document |
//! | `conflict` | 409 | edits no longer match the document |
//! | `upstream_error` | 502 | embedding or completion service failed (retryable) |
//! | `upstream_rejected` | 502 | the service refused the request (bad key, input too large) |
//! | `invalid_proposal` | 502 | model returned malformed edits |
//! | `timeout` | 504 | embedding or completion service timed out |
//! | `internal` | 500 | storage or configuration failure |

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clause_harness_core::ClauseError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Clause(#[from] ClauseError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Status code and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Clause(e) => match e {
                ClauseError::Input(_) => (StatusCode::BAD_REQUEST, "bad_request"),
                ClauseError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                ClauseError::Reconciliation(_) => (StatusCode::CONFLICT, "conflict"),
                ClauseError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
                ClauseError::TransientExternal(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
                ClauseError::Rejected(_) => (StatusCode::BAD_GATEWAY, "upstream_rejected"),
                ClauseError::Validation(_) => (StatusCode::BAD_GATEWAY, "invalid_proposal"),
                ClauseError::ProviderDisabled(_) => (StatusCode::BAD_REQUEST, "provider_disabled"),
                ClauseError::Config(_) | ClauseError::Storage(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "internal error".to_string()
        } else {
            if status.is_server_error() {
                tracing::warn!(error = %self, "upstream failure");
            }
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}
