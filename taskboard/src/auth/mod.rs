//! Token-derived identity for the signed-in user.
//!
//! The bearer token is persisted through a [`TokenStore`] owned by the
//! [`IdentityResolver`]; nothing else in the crate reads or writes session
//! state. Claims are decoded without signature verification and are used
//! for display and affordance gating only. The server authorizes every
//! request on its own.

pub mod claims;
pub mod login;
pub mod permissions;
pub mod resolver;
pub mod store;

pub use claims::{DecodeError, decode_token, resolve_identity};
pub use login::{LoginParseError, parse_login_response};
pub use permissions::{is_assignee, is_creator, is_owner};
pub use resolver::{IdentityResolver, SessionState};
pub use store::{AUTH_TOKEN_KEY, FileTokenStore, MemoryTokenStore, StoreError, TokenStore, USER_DATA_KEY};

use taskboard_proto::codec::CodecError;
use thiserror::Error;

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// An operation required a signed-in user and no token is stored.
    #[error("authentication required")]
    NotAuthenticated,
    /// The login response did not carry a usable token.
    #[error("login response rejected: {0}")]
    LoginResponse(#[from] LoginParseError),
    /// The token store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The identity could not be serialized for storage.
    #[error(transparent)]
    Codec(#[from] CodecError),
}
