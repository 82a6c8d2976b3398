//! Identity and token-claim shapes.
//!
//! [`Identity`] is what the client stores and displays for the signed-in
//! user. [`Claims`] is the decoded, unverified payload of a bearer token;
//! it is a display hint only and is never treated as an authorization
//! decision.

use serde::{Deserialize, Serialize};

/// The signed-in user as known to the client.
///
/// Serialized in the server's `PascalCase` shape, which is also the shape
/// persisted under the `userData` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Identity {
    /// User identifier. Never empty when derived from a present token.
    #[serde(default)]
    pub id: String,
    /// Given name, empty when unknown.
    #[serde(default)]
    pub first_name: String,
    /// Family name, empty when unknown.
    #[serde(default)]
    pub last_name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Role name, empty when unknown.
    #[serde(default)]
    pub role: String,
}

impl Identity {
    /// Full name, falling back to the email when both names are empty.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

/// A claim that servers emit either as a JSON string or as a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    /// String claim.
    Text(String),
    /// Numeric claim, e.g. an integer user id.
    Number(serde_json::Number),
}

impl ClaimValue {
    /// String form; `None` for an empty string so that empty claims fall
    /// through to the next candidate in a precedence chain.
    #[must_use]
    pub fn non_empty(&self) -> Option<String> {
        match self {
            Self::Text(s) if s.is_empty() => None,
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
        }
    }
}

/// Decoded bearer-token payload. All members are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<ClaimValue>,
    /// Alternative identifier claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ClaimValue>,
    /// Alternative identifier claim.
    #[serde(default, rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<ClaimValue>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Given name.
    #[serde(
        default,
        rename = "firstName",
        alias = "first_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(
        default,
        rename = "lastName",
        alias = "last_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_name: Option<String>,
    /// Role name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Expiry, seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<f64>,
}

impl Claims {
    /// First non-empty identifier among `sub`, `id`, `userId`.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        [&self.sub, &self.id, &self.user_id]
            .into_iter()
            .flatten()
            .find_map(ClaimValue::non_empty)
    }

    /// Non-empty `email` claim.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }

    /// Whether the token carried an `exp` claim that lies before `now_secs`.
    #[must_use]
    pub fn is_expired_at(&self, now_secs: f64) -> bool {
        self.exp.is_some_and(|exp| exp < now_secs)
    }
}
