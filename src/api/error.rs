//! Normalized API error.
//!
//! Every failure path of `ApiClient` ends up as an `ApiError` so callers can
//! branch on `status` / `code` without inspecting transport errors.

use std::error::Error as _;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status used for client-side timeouts.
pub const STATUS_TIMEOUT: u16 = 408;

/// Status used for transport failures where no HTTP response exists.
pub const STATUS_NETWORK: u16 = 0;

pub const TIMEOUT_MESSAGE: &str = "Request timed out";
pub const NETWORK_MESSAGE: &str = "Network request failed";

pub const CODE_TIMEOUT: &str = "TIMEOUT";
pub const CODE_NETWORK: &str = "NETWORK_ERROR";
pub const CODE_INVALID_JSON: &str = "INVALID_JSON";
pub const CODE_DECODE: &str = "DECODE_ERROR";

/// Uniform `{ message, status?, code? }` error shape.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, status: Option<u16>, code: Option<String>) -> Self {
        Self {
            message: message.into(),
            status,
            code,
        }
    }

    /// The request exceeded the configured timeout.
    pub fn timeout() -> Self {
        Self::new(
            TIMEOUT_MESSAGE,
            Some(STATUS_TIMEOUT),
            Some(CODE_TIMEOUT.to_string()),
        )
    }

    /// Transport failure (DNS, connect, TLS, reset...). Empty causes get the
    /// generic message.
    pub fn network(cause: impl Into<String>) -> Self {
        let cause = cause.into();
        let message = if cause.trim().is_empty() {
            NETWORK_MESSAGE.to_string()
        } else {
            cause
        };
        Self::new(message, Some(STATUS_NETWORK), Some(CODE_NETWORK.to_string()))
    }

    pub fn is_timeout(&self) -> bool {
        self.status == Some(STATUS_TIMEOUT)
    }

    pub fn is_network(&self) -> bool {
        self.status == Some(STATUS_NETWORK)
    }

    /// 401 / 403 from the backend.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status, Some(401) | Some(403))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ApiError::timeout();
        }
        ApiError::network(describe_transport_error(&err))
    }
}

/// Flatten the error source chain; reqwest's top-level message alone is
/// usually just "error sending request".
fn describe_transport_error(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_shape() {
        let err = ApiError::timeout();
        assert_eq!(err.status, Some(408));
        assert_eq!(err.message, TIMEOUT_MESSAGE);
        assert!(err.is_timeout());
        assert!(!err.is_network());
    }

    #[test]
    fn test_network_falls_back_to_generic_message() {
        assert_eq!(ApiError::network("").message, NETWORK_MESSAGE);
        assert_eq!(ApiError::network("dns error").message, "dns error");
        assert_eq!(ApiError::network("x").status, Some(0));
    }

    #[test]
    fn test_serializes_without_absent_fields() {
        let err = ApiError::new("boom", None, None);
        assert_eq!(serde_json::to_string(&err).unwrap(), r#"{"message":"boom"}"#);

        let err = ApiError::new("nope", Some(404), Some("NOT_FOUND".into()));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status"], 404);
        assert_eq!(json["code"], "NOT_FOUND");
    }

    #[test]
    fn test_unauthorized_statuses() {
        assert!(ApiError::new("expired", Some(401), None).is_unauthorized());
        assert!(ApiError::new("forbidden", Some(403), None).is_unauthorized());
        assert!(!ApiError::timeout().is_unauthorized());
    }

    #[test]
    fn test_display_is_message() {
        assert_eq!(ApiError::new("bad input", Some(422), None).to_string(), "bad input");
    }
}
