//! JSON encode/decode for the REST boundary.
//!
//! Thin wrappers over `serde_json` that map failures into [`CodecError`]
//! with enough context to tell which payload was malformed.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::identity::Identity;
use crate::task::Task;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The payload was not valid JSON for the expected shape.
    #[error("invalid {what} payload: {reason}")]
    InvalidPayload {
        /// Which shape was expected.
        what: &'static str,
        /// Decoder message.
        reason: String,
    },
}

/// Encodes any serializable value as JSON bytes.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the value cannot be serialized.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value).map_err(|e| CodecError::Serialization(e.to_string()))
}

fn decode_as<T: DeserializeOwned>(bytes: &[u8], what: &'static str) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::InvalidPayload {
        what,
        reason: e.to_string(),
    })
}

/// Decodes a single task.
///
/// # Errors
///
/// Returns `CodecError::InvalidPayload` if the bytes are not a task object.
pub fn decode_task(bytes: &[u8]) -> Result<Task, CodecError> {
    decode_as(bytes, "task")
}

/// Decodes a task list (a JSON array of task objects).
///
/// # Errors
///
/// Returns `CodecError::InvalidPayload` if the bytes are not a task array.
pub fn decode_tasks(bytes: &[u8]) -> Result<Vec<Task>, CodecError> {
    decode_as(bytes, "task list")
}

/// Decodes an identity object.
///
/// # Errors
///
/// Returns `CodecError::InvalidPayload` if the bytes are not an identity object.
pub fn decode_identity(bytes: &[u8]) -> Result<Identity, CodecError> {
    decode_as(bytes, "identity")
}

/// Encodes an identity as a JSON string, the form persisted under `userData`.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if serialization fails.
pub fn identity_to_string(identity: &Identity) -> Result<String, CodecError> {
    serde_json::to_string(identity).map_err(|e| CodecError::Serialization(e.to_string()))
}
