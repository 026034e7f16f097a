//! API error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Request-level failures. Every variant renders as `{"detail": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed body or a field that failed validation.
    #[error("{0}")]
    Validation(String),

    #[error("SQL size ({size_mb:.2}MB) exceeds maximum allowed size ({max_mb}MB)")]
    SqlTooLarge { size_mb: f64, max_mb: u64 },

    #[error("Request body size ({size_mb:.2}MB) exceeds maximum allowed size ({max_mb}MB)")]
    BodyTooLarge { size_mb: f64, max_mb: u64 },

    /// The body outgrew the limit while streaming, so its size is unknown.
    #[error("Request body exceeds maximum allowed size ({max_mb}MB)")]
    BodyLimit { max_mb: u64 },

    #[error("Lineage analysis timed out after {0} seconds")]
    Timeout(u64),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::SqlTooLarge { .. } | Self::BodyTooLarge { .. } | Self::BodyLimit { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Size of `bytes` in megabytes, as reported in 413 details.
pub fn megabytes(bytes: usize) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_detail_uses_two_decimals() {
        let err = ApiError::SqlTooLarge {
            size_mb: megabytes(3 * 1024 * 1024 + 512 * 1024),
            max_mb: 2,
        };
        assert_eq!(
            err.to_string(),
            "SQL size (3.50MB) exceeds maximum allowed size (2MB)"
        );
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn statuses() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::Timeout(30).status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
