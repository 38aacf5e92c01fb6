use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub const FALLBACK_API_MESSAGE: &str = "API error occurred";

/// Failures raised by the HTTP gateway.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ApiError {
    /// Non-2xx response; `message` is the response body text.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    Transport(String),

    #[error("unexpected response payload: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn http(status: u16, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            FALLBACK_API_MESSAGE.to_string()
        } else {
            body.to_string()
        };
        ApiError::Http { status, message }
    }
}

/// The rejection reason every store operation resolves to.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0}")]
    Permission(String),

    #[error("{0}")]
    Validation(String),

    #[error("session storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn permission(msg: impl Into<String>) -> Self {
        StoreError::Permission(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        StoreError::Validation(msg.into())
    }

    /// Cancellation comes from closing a store; it is not a user-facing failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StoreError::Api(ApiError::Cancelled))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Store(StoreError::Permission(_)) => StatusCode::FORBIDDEN,
            AppError::Store(StoreError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(StoreError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store(StoreError::Api(api)) => match api {
                ApiError::Http { status, .. } if (400..500).contains(status) => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                ApiError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            },
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_uses_body_text() {
        let err = ApiError::http(409, "Slot already taken");
        assert_eq!(err.to_string(), "Slot already taken");
    }

    #[test]
    fn test_http_error_falls_back_on_empty_body() {
        let err = ApiError::http(500, "  ");
        assert_eq!(err.to_string(), FALLBACK_API_MESSAGE);
    }

    #[test]
    fn test_store_error_displays_reason_only() {
        let err: StoreError = ApiError::http(400, "Invalid pincode").into();
        assert_eq!(err.to_string(), "Invalid pincode");
        assert_eq!(
            StoreError::permission("Only admin can delete service").to_string(),
            "Only admin can delete service"
        );
    }

    #[test]
    fn test_status_mapping() {
        let res = AppError::from(StoreError::permission("nope")).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = AppError::from(StoreError::Api(ApiError::http(404, "missing"))).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = AppError::from(StoreError::Api(ApiError::http(503, "down"))).into_response();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

        let res = AppError::from(StoreError::Api(ApiError::Timeout(Duration::from_secs(1))))
            .into_response();
        assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
