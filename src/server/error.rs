use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::logging::sanitize_log_message;
use crate::twilio::{TokenError, TwilioError};

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid Twilio signature")]
    InvalidSignature,

    /// A Twilio REST call failed; `context` is the client-facing summary.
    #[error("{context}: {source}")]
    Provider {
        context: &'static str,
        #[source]
        source: TwilioError,
    },

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl ApiError {
    pub fn provider(context: &'static str, source: TwilioError) -> Self {
        ApiError::Provider { context, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::InvalidSignature => {
                warn!("rejected webhook with invalid signature");
                (
                    StatusCode::FORBIDDEN,
                    json!({ "error": "Invalid Twilio signature" }),
                )
            }
            ApiError::Provider { context, source } => {
                let details = sanitize_log_message(&source.to_string());
                error!(code = ?source.code(), "{}: {}", context, details);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": context,
                        "details": details,
                        "code": source.code(),
                    }),
                )
            }
            ApiError::Token(TokenError::EmptyIdentity) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": TokenError::EmptyIdentity.to_string() }),
            ),
            ApiError::Token(err) => {
                error!("token generation failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": err.to_string() }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twilio::TwilioApiError;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidSignature.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::provider("Failed to make call", TwilioError::NotConfigured)
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(TokenError::NotConfigured)
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(TokenError::EmptyIdentity)
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_provider_display() {
        let err = ApiError::provider(
            "Failed to send SMS",
            TwilioError::Api(TwilioApiError {
                code: Some(21608),
                message: "Unverified number".to_string(),
                more_info: None,
                status: 400,
            }),
        );
        assert_eq!(err.to_string(), "Failed to send SMS: Unverified number");
    }
}
