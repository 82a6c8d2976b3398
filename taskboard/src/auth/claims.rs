//! Bearer-token payload decoding and identity resolution.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use taskboard_proto::identity::{Claims, Identity};
use thiserror::Error;

/// Why a token payload could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The token is not three dot-separated segments.
    #[error("token has {0} segments, expected 3")]
    Segments(usize),
    /// The payload segment is not base64.
    #[error("token payload is not valid base64: {0}")]
    Base64(String),
    /// The decoded payload is not UTF-8.
    #[error("token payload is not valid UTF-8")]
    Utf8,
    /// The decoded payload is not a JSON object of claims.
    #[error("token payload is not a claims object: {0}")]
    Json(String),
}

/// Decodes the payload segment of a JWT without verifying its signature.
///
/// Accepts base64url (the JWT alphabet) and standard base64, with or without
/// padding.
///
/// # Errors
///
/// Returns a [`DecodeError`] describing the first structural, base64, UTF-8
/// or JSON failure.
pub fn decode_token(token: &str) -> Result<Claims, DecodeError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(DecodeError::Segments(parts.len()));
    }
    let payload = parts[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    let text = std::str::from_utf8(&bytes).map_err(|_| DecodeError::Utf8)?;
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| DecodeError::Json(e.to_string()))?;
    if !value.is_object() {
        return Err(DecodeError::Json(format!(
            "expected an object, found {}",
            json_kind(&value)
        )));
    }
    serde_json::from_value(value).map_err(|e| DecodeError::Json(e.to_string()))
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Builds a best-effort identity from a token.
///
/// Id precedence: `sub`, `id`, `userId`, a non-empty `fallback_email`, the
/// `email` claim, then a synthetic `user-<unix millis>`, so the id is never
/// empty. Email precedence: `email`, then `fallback_email`. Names and role
/// default to empty. A token that fails to decode yields the fallback
/// identity; the failure is logged and never returned.
#[must_use]
pub fn resolve_identity(token: &str, fallback_email: &str) -> Identity {
    let claims = decode_token(token).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not decode session token, using fallback identity");
        Claims::default()
    });

    let id = claims
        .subject()
        .or_else(|| (!fallback_email.is_empty()).then(|| fallback_email.to_string()))
        .or_else(|| claims.email().map(str::to_string))
        .unwrap_or_else(synthetic_id);

    Identity {
        id,
        email: claims
            .email()
            .map_or_else(|| fallback_email.to_string(), str::to_string),
        first_name: claims.first_name.unwrap_or_default(),
        last_name: claims.last_name.unwrap_or_default(),
        role: claims.role.unwrap_or_default(),
    }
}

/// Placeholder id for a session that carries no usable identifier.
fn synthetic_id() -> String {
    let id = format!("user-{}", chrono::Utc::now().timestamp_millis());
    tracing::warn!(%id, "session token carries no identifier, using synthetic id");
    id
}
