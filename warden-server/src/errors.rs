use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Machine-readable error classes exposed by every non-2xx API response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The login state is unknown, expired or already consumed
    InvalidState,
    /// The identity provider rejected the authorization code exchange
    ExchangeFailed,
    /// The request carries no usable proof of identity
    Unauthorized,
    /// The authenticated subject is not allowed to perform the action
    Forbidden,
    /// The requested entity does not exist
    NotFound,
    /// The request body failed validation
    Validation,
    /// A guarded route declares no action and resource to check
    AbacMetaMissing,
    /// The server is misconfigured
    Configuration,
    /// The identity provider misbehaved
    Upstream,
    /// Everything else
    Internal,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidState | ErrorCode::ExchangeFailed | ErrorCode::Validation => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Upstream => StatusCode::BAD_GATEWAY,
            ErrorCode::AbacMetaMissing | ErrorCode::Configuration | ErrorCode::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// API error response carrying an error class and a human-readable detail
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub code: ErrorCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    pub fn invalid_state(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, detail)
    }

    pub fn exchange_failed(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExchangeFailed, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, detail)
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, detail)
    }

    pub fn abac_meta_missing(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::AbacMetaMissing, detail)
    }

    pub fn configuration(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::Configuration, detail)
    }

    pub fn upstream(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::Upstream, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, detail)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = Json(json!({
            "error": self.code,
            "detail": self.detail,
        }));
        (status, body).into_response()
    }
}

impl From<abac_engine::StoreError> for ApiError {
    fn from(err: abac_engine::StoreError) -> Self {
        ApiError::internal(format!("Permission store error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_map_to_statuses() {
        assert_eq!(ErrorCode::InvalidState.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::ExchangeFailed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Upstream.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ErrorCode::AbacMetaMissing.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::Configuration.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ErrorCode::Internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_code_wire_names() {
        assert_eq!(
            serde_json::to_value(ErrorCode::AbacMetaMissing).unwrap(),
            serde_json::json!("ABAC_META_MISSING")
        );
        assert_eq!(
            serde_json::to_value(ErrorCode::InvalidState).unwrap(),
            serde_json::json!("INVALID_STATE")
        );
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::forbidden("Access denied for read on dashboard");
        assert_eq!(err.to_string(), "Forbidden: Access denied for read on dashboard");
    }
}
