use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("message parse error: {0}")]
    ParseError(String),

    /// Retryable failures (429, 5xx, transport) persisted through every attempt.
    #[error("delivery failed after {attempts} attempts: {last_error}")]
    DeliveryExhausted { attempts: u32, last_error: String },

    /// A non-retryable HTTP status from the platform API.
    #[error("delivery rejected with HTTP {status}: {body}")]
    DeliveryRejected { status: u16, body: String },

    /// HTTP 200 carrying `ok: false`.
    #[error("platform error: {0}")]
    PlatformError(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Status code presented to the inbound caller. Never carries detail.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::SignatureInvalid(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match status {
            StatusCode::FORBIDDEN => {
                tracing::warn!(error = %self, "rejected unauthenticated request");
                (status, "invalid signature").into_response()
            }
            _ => {
                tracing::error!(error = %self, "request failed");
                (status, "internal error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_failures_map_to_forbidden() {
        let err = RelayError::SignatureInvalid("stale timestamp".to_string());
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn everything_else_maps_to_internal_error() {
        let errs = [
            RelayError::ParseError("bad json".to_string()),
            RelayError::Internal("boom".to_string()),
            RelayError::Config("missing".to_string()),
        ];
        for err in errs {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[tokio::test]
    async fn response_body_leaks_no_detail() {
        let resp = RelayError::ParseError("secret detail at line 3".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(body, "internal error");
        assert!(!body.contains("secret detail"));
    }

    #[test]
    fn exhausted_message_names_attempts() {
        let err = RelayError::DeliveryExhausted {
            attempts: 3,
            last_error: "HTTP 503".to_string(),
        };
        assert_eq!(err.to_string(), "delivery failed after 3 attempts: HTTP 503");
    }
}
