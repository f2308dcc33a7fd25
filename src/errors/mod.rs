//! Error handling module for the EstimAÍ client.
//!
//! Provides the client error taxonomy, stable error codes, and the backend's
//! error envelope so failed responses can be decoded into something useful.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
    pub const HTTP_ERROR: &str = "HTTP_ERROR";
    pub const DECODE_ERROR: &str = "DECODE_ERROR";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const CHANNEL_ERROR: &str = "CHANNEL_ERROR";
    pub const EMPTY_RESPONSE: &str = "EMPTY_RESPONSE";
    pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";
}

/// Client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration could not be loaded
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Transport-level HTTP failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with an error envelope
    #[error("{code}: {message} (HTTP {status})")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },

    /// A payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Request rejected locally before anything was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Push channel failure
    #[error("Channel error: {0}")]
    Channel(String),
}

impl ClientError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &str {
        match self {
            ClientError::Config(_) => codes::CONFIG_ERROR,
            ClientError::Http(_) => codes::HTTP_ERROR,
            ClientError::Api { code, .. } => code,
            ClientError::Decode(_) => codes::DECODE_ERROR,
            ClientError::Validation(_) => codes::VALIDATION_ERROR,
            ClientError::Channel(_) => codes::CHANNEL_ERROR,
        }
    }

    /// Whether the backend reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// Build an API error from a non-success response body.
    ///
    /// Bodies that are not a valid envelope still produce an error carrying
    /// the status and the raw text.
    pub fn from_response_body(status: StatusCode, body: &str) -> Self {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(envelope) => ClientError::Api {
                status,
                code: envelope.error.code,
                message: envelope.error.message,
            },
            Err(_) => {
                let message = if body.trim().is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                } else {
                    body.trim().to_string()
                };
                ClientError::Api {
                    status,
                    code: codes::UNKNOWN_ERROR.to_string(),
                    message,
                }
            }
        }
    }
}

/// Result alias used throughout the crate.
pub type ClientResult<T> = Result<T, ClientError>;

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope returned by the backend.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_is_decoded() {
        let body = r#"{"success":false,"error":{"code":"NOT_FOUND","message":"Story s1 not found"}}"#;
        let err = ClientError::from_response_body(StatusCode::NOT_FOUND, body);

        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "NOT_FOUND: Story s1 not found (HTTP 404 Not Found)");
    }

    #[test]
    fn test_plain_body_falls_back() {
        let err = ClientError::from_response_body(StatusCode::BAD_GATEWAY, "upstream down\n");

        assert_eq!(err.error_code(), codes::UNKNOWN_ERROR);
        match err {
            ClientError::Api { message, .. } => assert_eq!(message, "upstream down"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_body_uses_reason_phrase() {
        let err = ClientError::from_response_body(StatusCode::SERVICE_UNAVAILABLE, "");

        match err {
            ClientError::Api { message, .. } => assert_eq!(message, "Service Unavailable"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
