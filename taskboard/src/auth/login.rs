//! Login response parsing.
//!
//! The login endpoint has been seen to answer either with the bare token as
//! a JSON string or with an object carrying it under one of several names.
//! All of that probing lives in [`parse_login_response`].

use serde_json::Value;
use thiserror::Error;

/// Member names that may carry the token, in lookup order.
const TOKEN_FIELDS: [&str; 3] = ["token", "access_token", "accessToken"];

/// Why a login response did not yield a token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoginParseError {
    /// The response was an empty string.
    #[error("empty token")]
    EmptyToken,
    /// The response object had no non-empty token member.
    #[error("no token member in login response")]
    MissingToken,
    /// The response was neither a string nor an object.
    #[error("unexpected login response type: {0}")]
    UnexpectedShape(&'static str),
}

/// Extracts the bearer token from a login response body.
///
/// # Errors
///
/// Returns a [`LoginParseError`] when the body is not a non-empty string or
/// an object with a non-empty `token`, `access_token` or `accessToken`
/// string member.
pub fn parse_login_response(body: &Value) -> Result<String, LoginParseError> {
    match body {
        Value::String(token) if token.is_empty() => Err(LoginParseError::EmptyToken),
        Value::String(token) => Ok(token.clone()),
        Value::Object(map) => TOKEN_FIELDS
            .iter()
            .filter_map(|field| map.get(*field).and_then(Value::as_str))
            .find(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or(LoginParseError::MissingToken),
        Value::Null => Err(LoginParseError::UnexpectedShape("null")),
        Value::Bool(_) => Err(LoginParseError::UnexpectedShape("boolean")),
        Value::Number(_) => Err(LoginParseError::UnexpectedShape("number")),
        Value::Array(_) => Err(LoginParseError::UnexpectedShape("array")),
    }
}
