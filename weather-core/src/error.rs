use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message used when an upstream error body cannot be decoded.
pub const UNDECODABLE_ERROR_MESSAGE: &str = "Something went wrong...";

/// Message used when a successful upstream body is not a valid resource.
pub const DECODE_ERROR_MESSAGE: &str = "Failed to unmarshal resource response.";

/// Error surfaced by every stage of a fetch, and the JSON body returned to callers.
///
/// `kind` is the status phrase of the failure (e.g. "Not Found"), serialized as `type`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct FetchError {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Error whose kind is the canonical phrase of `status`.
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status_text(status), message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::from_status(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::from_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::from_status(StatusCode::NOT_FOUND, message)
    }

    /// Fixed error for a 2xx upstream body that does not decode into the resource.
    pub fn decode() -> Self {
        Self::internal(DECODE_ERROR_MESSAGE)
    }
}

/// Canonical reason phrase for a status code, empty for unknown codes.
pub fn status_text(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("")
}
