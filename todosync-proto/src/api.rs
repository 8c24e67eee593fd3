//! Response envelope shared by every endpoint of the task API.
//!
//! A call only counts as successful when the transport succeeded *and*
//! the envelope says `success: true`. The failure message is taken from
//! `message`, then `error.message`, then a caller-supplied fallback.

use serde::{Deserialize, Serialize};

/// Structured error detail carried in a failed envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g. `NOT_FOUND`).
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Extra detail, usually for debugging.
    #[serde(default)]
    pub details: Option<String>,
}

/// Generic `{ success, data, message, error, timestamp }` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the server considers the call successful.
    pub success: bool,
    /// Payload, present on success for calls that return data.
    pub data: Option<T>,
    /// Human-readable status message.
    #[serde(default)]
    pub message: Option<String>,
    /// Structured error, present on failure.
    #[serde(default)]
    pub error: Option<ErrorBody>,
    /// Server time the response was produced.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Builds a successful envelope around `data`.
    #[must_use]
    pub const fn ok(data: T, timestamp: Option<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
            timestamp,
        }
    }

    /// Builds a successful envelope without a payload.
    #[must_use]
    pub const fn empty(timestamp: Option<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: None,
            error: None,
            timestamp,
        }
    }

    /// Builds a failed envelope with an error code and message.
    #[must_use]
    pub fn failure(code: &str, message: &str, timestamp: Option<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.to_string()),
            error: Some(ErrorBody {
                code: Some(code.to_string()),
                message: Some(message.to_string()),
                details: None,
            }),
            timestamp,
        }
    }

    /// Picks the most specific human-readable failure message available.
    #[must_use]
    pub fn failure_message(&self, fallback: &str) -> String {
        self.message
            .clone()
            .or_else(|| self.error.as_ref().and_then(|e| e.message.clone()))
            .unwrap_or_else(|| fallback.to_string())
    }
}
