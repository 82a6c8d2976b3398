//! Session lifecycle over a [`TokenStore`].

use std::time::{SystemTime, UNIX_EPOCH};

use taskboard_proto::codec::{decode_identity, identity_to_string};
use taskboard_proto::identity::Identity;

use super::AuthError;
use super::claims::{decode_token, resolve_identity};
use super::store::{AUTH_TOKEN_KEY, TokenStore, USER_DATA_KEY};

/// State of the persisted session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No token is stored.
    Missing,
    /// A token is stored and not known to be expired.
    Active,
    /// The stored token was expired; the session has been cleared.
    Expired,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "signed out"),
            Self::Active => write!(f, "active"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// Owns the token store and derives the current identity from it.
///
/// This is the single place where persisted auth state is read or written.
pub struct IdentityResolver<S: TokenStore> {
    store: S,
}

impl<S: TokenStore> IdentityResolver<S> {
    /// Creates a resolver over `store`.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Seconds since the Unix epoch.
    fn now_secs() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }

    /// Persists a new session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] if either key cannot be written, or
    /// [`AuthError::Codec`] if the identity cannot be serialized.
    pub fn begin_session(&self, token: &str, identity: &Identity) -> Result<(), AuthError> {
        let user_data = identity_to_string(identity)?;
        self.store.set(AUTH_TOKEN_KEY, token)?;
        self.store.set(USER_DATA_KEY, &user_data)?;
        tracing::info!(user_id = %identity.id, "session started");
        Ok(())
    }

    /// Clears the persisted session. Safe to call repeatedly; store failures
    /// are logged.
    pub fn end_session(&self) {
        for key in [AUTH_TOKEN_KEY, USER_DATA_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key, error = %e, "failed to clear session key");
            }
        }
        tracing::debug!("session cleared");
    }

    /// The stored bearer token, if any.
    #[must_use]
    pub fn bearer_token(&self) -> Option<String> {
        self.store.get(AUTH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// The current identity, or `None` when signed out.
    ///
    /// Prefers the identity cached at login. If that is missing or
    /// unreadable, the identity is re-derived from the token.
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        let token = self.bearer_token()?;
        let cached = self.store.get(USER_DATA_KEY).and_then(|raw| {
            decode_identity(raw.as_bytes())
                .inspect_err(|e| tracing::warn!(error = %e, "cached identity unreadable"))
                .ok()
        });

        match cached {
            Some(identity) if !identity.id.is_empty() => Some(identity),
            cached => {
                let fallback_email = cached.map(|i| i.email).unwrap_or_default();
                Some(resolve_identity(&token, &fallback_email))
            }
        }
    }

    /// The current identity, failing when signed out.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAuthenticated`] when no token is stored.
    pub fn require_identity(&self) -> Result<Identity, AuthError> {
        self.current_identity().ok_or(AuthError::NotAuthenticated)
    }

    /// Whether `token` is usable, clearing the session if it has expired.
    ///
    /// A token without an `exp` claim, or one that cannot be decoded, is
    /// treated as valid; the server remains the authority.
    pub fn is_token_valid(&self, token: &str) -> bool {
        self.is_token_valid_at(token, Self::now_secs())
    }

    /// [`is_token_valid`](Self::is_token_valid) against an explicit clock.
    pub fn is_token_valid_at(&self, token: &str, now_secs: f64) -> bool {
        match decode_token(token) {
            Ok(claims) if claims.is_expired_at(now_secs) => {
                tracing::info!("session token expired");
                self.end_session();
                false
            }
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "token not decodable, assuming valid");
                true
            }
        }
    }

    /// Checks the stored session, clearing it if expired.
    pub fn check_session(&self) -> SessionState {
        match self.bearer_token() {
            None => SessionState::Missing,
            Some(token) if self.is_token_valid(&token) => SessionState::Active,
            Some(_) => SessionState::Expired,
        }
    }
}
