//! JSON encoding and decoding for task API payloads.
//!
//! Thin wrappers over `serde_json` that fold its errors into a single
//! [`CodecError`] so callers on both sides of the wire share one error type.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The input was not valid JSON for the expected type.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Encodes a value as a compact JSON string.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the value cannot be serialized.
pub fn encode<T: Serialize>(value: &T) -> Result<String, CodecError> {
    serde_json::to_string(value).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Encodes a value as indented JSON, for files meant to be read by people.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the value cannot be serialized.
pub fn encode_pretty<T: Serialize>(value: &T) -> Result<String, CodecError> {
    serde_json::to_string_pretty(value).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a value from a JSON string.
///
/// # Errors
///
/// Returns `CodecError::Malformed` if the text is not valid JSON for `T`.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
    serde_json::from_str(text).map_err(|e| CodecError::Malformed(e.to_string()))
}
