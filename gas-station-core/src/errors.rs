//! Error types shared across gas-station crates.
//!
//! [`HttpError`] is the single error shape that reaches the HTTP boundary.
//! Every crate converts its own terminal failures into it, and the server
//! renders it as an [`ErrorBody`].

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Status used when an error carries a code outside the valid HTTP range.
pub const INTERNAL_SERVER_ERROR: u16 = 500;

/// An error destined for an HTTP client.
///
/// The message is a JSON value so that handlers can return either a plain
/// string or a structured payload (validation details, for example).
#[derive(Error, Debug, Clone, PartialEq)]
pub struct HttpError {
    /// HTTP status code.
    pub status: u16,
    /// Message or structured payload.
    pub message: serde_json::Value,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            serde_json::Value::String(msg) => write!(f, "HTTP {}: {}", self.status, msg),
            other => write!(f, "HTTP {}: {}", self.status, other),
        }
    }
}

impl HttpError {
    /// Create an error with an arbitrary status and message.
    pub fn new(status: u16, message: impl Into<serde_json::Value>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<serde_json::Value>) -> Self {
        Self::new(400, message)
    }

    /// 401 Unauthorized.
    pub fn unauthorized(message: impl Into<serde_json::Value>) -> Self {
        Self::new(401, message)
    }

    /// 403 Forbidden.
    pub fn forbidden(message: impl Into<serde_json::Value>) -> Self {
        Self::new(403, message)
    }

    /// 404 Not Found.
    pub fn not_found(message: impl Into<serde_json::Value>) -> Self {
        Self::new(404, message)
    }

    /// 409 Conflict.
    pub fn conflict(message: impl Into<serde_json::Value>) -> Self {
        Self::new(409, message)
    }

    /// 422 Unprocessable Entity.
    pub fn unprocessable(message: impl Into<serde_json::Value>) -> Self {
        Self::new(422, message)
    }

    /// 500 Internal Server Error.
    pub fn internal(message: impl Into<serde_json::Value>) -> Self {
        Self::new(INTERNAL_SERVER_ERROR, message)
    }

    /// 502 Bad Gateway.
    pub fn bad_gateway(message: impl Into<serde_json::Value>) -> Self {
        Self::new(502, message)
    }

    /// 503 Service Unavailable.
    pub fn service_unavailable(message: impl Into<serde_json::Value>) -> Self {
        Self::new(503, message)
    }

    /// The status to put on the wire.
    ///
    /// Codes outside `100..=599` collapse to 500.
    pub fn effective_status(&self) -> u16 {
        if (100..=599).contains(&self.status) {
            self.status
        } else {
            INTERNAL_SERVER_ERROR
        }
    }

    /// Check if this is a server-side (5xx) error.
    pub fn is_server_error(&self) -> bool {
        self.effective_status() >= 500
    }
}

/// JSON body written for every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP status code.
    pub status: u16,
    /// Message or structured payload.
    pub message: serde_json::Value,
    /// When the error was rendered, RFC 3339 with millisecond precision.
    pub timestamp: String,
    /// Request path that produced the error.
    pub path: String,
}

impl ErrorBody {
    /// Render an error for the given request path, stamped now.
    pub fn new(error: &HttpError, path: impl Into<String>) -> Self {
        Self::at(error, path, Utc::now())
    }

    /// Render an error with an explicit timestamp.
    pub fn at(error: &HttpError, path: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            status: error.effective_status(),
            message: error.message.clone(),
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            path: path.into(),
        }
    }
}

/// Result type alias using HttpError.
pub type Result<T> = std::result::Result<T, HttpError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(HttpError::bad_request("x"), 400)]
    #[case(HttpError::unauthorized("x"), 401)]
    #[case(HttpError::forbidden("x"), 403)]
    #[case(HttpError::not_found("x"), 404)]
    #[case(HttpError::conflict("x"), 409)]
    #[case(HttpError::unprocessable("x"), 422)]
    #[case(HttpError::internal("x"), 500)]
    #[case(HttpError::bad_gateway("x"), 502)]
    #[case(HttpError::service_unavailable("x"), 503)]
    fn test_constructor_statuses(#[case] error: HttpError, #[case] status: u16) {
        assert_eq!(error.status, status);
        assert_eq!(error.effective_status(), status);
    }

    #[rstest]
    #[case(0)]
    #[case(99)]
    #[case(600)]
    #[case(1000)]
    fn test_invalid_status_collapses_to_500(#[case] status: u16) {
        let error = HttpError::new(status, "broken");
        assert_eq!(error.effective_status(), 500);
        assert!(error.is_server_error());
    }

    #[test]
    fn test_display() {
        let error = HttpError::not_found("Station not found");
        assert_eq!(error.to_string(), "HTTP 404: Station not found");

        let error = HttpError::bad_request(serde_json::json!({"field": "price"}));
        assert_eq!(error.to_string(), r#"HTTP 400: {"field":"price"}"#);
    }

    #[test]
    fn test_error_body_shape() {
        let error = HttpError::internal("RETRIES_EXCEEDED - Error: upstream down");
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let body = ErrorBody::at(&error, "/pumps/7", timestamp);

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": 500,
                "message": "RETRIES_EXCEEDED - Error: upstream down",
                "timestamp": "2024-03-01T12:30:00.000Z",
                "path": "/pumps/7",
            })
        );
    }

    #[test]
    fn test_error_body_uses_effective_status() {
        let error = HttpError::new(42, "odd");
        let body = ErrorBody::new(&error, "/");
        assert_eq!(body.status, 500);
        assert!(body.timestamp.ends_with('Z'));
    }
}
