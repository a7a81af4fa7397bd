//! Failure types for outbound requests.

use bytes::Bytes;
use gas_station_core::HttpError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kind of transport fault that produced no HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportFaultKind {
    /// The request timed out.
    Timeout,
    /// DNS failure, refused or reset connection.
    Connect,
    /// The request could not be built (bad URL, bad header).
    Request,
    /// The response body could not be read.
    Body,
    /// Anything else reported by the client.
    Other,
}

impl fmt::Display for TransportFaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportFaultKind::Timeout => "Timeout",
            TransportFaultKind::Connect => "Connection error",
            TransportFaultKind::Request => "Invalid request",
            TransportFaultKind::Body => "Body error",
            TransportFaultKind::Other => "Transport error",
        };
        f.write_str(name)
    }
}

/// Failure of a single outbound request.
#[derive(Debug, Clone, Error)]
pub enum RequestFailure {
    /// The server answered with a non-2xx status.
    #[error("HTTP error {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
        /// Raw response body.
        body: Bytes,
    },

    /// No response was received.
    #[error("{kind}: {message}")]
    Transport {
        /// What went wrong.
        kind: TransportFaultKind,
        /// Error description from the client.
        message: String,
    },
}

impl RequestFailure {
    /// Create a status failure.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
            body: Bytes::new(),
        }
    }

    /// Create a transport failure.
    pub fn transport(kind: TransportFaultKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    /// HTTP status, when a response was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } => None,
        }
    }

    /// Human-readable message without the status prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Status { message, .. } | Self::Transport { message, .. } => message,
        }
    }
}

impl From<reqwest::Error> for RequestFailure {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportFaultKind::Timeout
        } else if err.is_connect() {
            TransportFaultKind::Connect
        } else if err.is_builder() {
            TransportFaultKind::Request
        } else if err.is_body() || err.is_decode() {
            TransportFaultKind::Body
        } else {
            TransportFaultKind::Other
        };
        RequestFailure::transport(kind, err.to_string())
    }
}

/// Classification tag carried by a terminal retry error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The retry chain ended without a successful response.
    RetriesExceeded,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::RetriesExceeded => f.write_str("RETRIES_EXCEEDED"),
        }
    }
}

/// Terminal failure of a retry chain.
///
/// Only the last attempt's status and message are kept.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind} - Error: {message}")]
pub struct RetriesExceeded {
    /// Always [`ErrorKind::RetriesExceeded`].
    pub kind: ErrorKind,
    /// Status of the last failure, if it had one.
    pub status_code: Option<u16>,
    /// Message of the last failure.
    pub message: String,
    /// Requests issued in the chain.
    pub attempts: u32,
}

impl RetriesExceeded {
    /// Build from the last failure of a chain.
    pub fn from_failure(failure: &RequestFailure, attempts: u32) -> Self {
        Self {
            kind: ErrorKind::RetriesExceeded,
            status_code: failure.status_code(),
            message: failure.message().to_string(),
            attempts,
        }
    }
}

impl From<RetriesExceeded> for HttpError {
    fn from(err: RetriesExceeded) -> Self {
        HttpError::internal(err.to_string())
    }
}
