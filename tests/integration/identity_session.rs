//! Integration tests for session handling: token decoding fallbacks, expiry,
//! ownership checks, login response parsing, and the file-backed store.
//!
//! Verification command: `cargo test --test identity_session`

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde_json::json;

use taskboard::auth::{
    AUTH_TOKEN_KEY, DecodeError, FileTokenStore, IdentityResolver, LoginParseError,
    MemoryTokenStore, SessionState, TokenStore, USER_DATA_KEY, decode_token, is_owner,
    parse_login_response, resolve_identity,
};
use taskboard_proto::identity::Identity;

// =============================================================================
// Test helpers
// =============================================================================

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique session file path per test, so parallel tests never collide.
fn temp_session_path(name: &str) -> PathBuf {
    let n = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir()
        .join("taskboard-integ-session")
        .join(format!("{name}-{}-{n}", std::process::id()))
        .join("session.json")
}

fn jwt(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.sig")
}

fn identity(id: &str, email: &str) -> Identity {
    Identity {
        id: id.to_string(),
        email: email.to_string(),
        ..Identity::default()
    }
}

// =============================================================================
// Identity fallback chain
// =============================================================================

#[test]
fn email_only_payload_uses_email_as_id() {
    let token = jwt(&json!({ "email": "a@b.com" }));
    let id = resolve_identity(&token, "");
    assert_eq!(id.id, "a@b.com");
    assert_eq!(id.email, "a@b.com");
}

#[test]
fn undecodable_token_falls_back_entirely() {
    let id = resolve_identity("not-a-jwt", "me@x.com");
    assert_eq!(id.id, "me@x.com");
    assert_eq!(id.email, "me@x.com");
    assert!(id.first_name.is_empty());
    assert!(id.role.is_empty());
}

#[test]
fn id_claim_precedence() {
    let all = jwt(&json!({ "sub": "s", "id": "i", "userId": "u" }));
    assert_eq!(resolve_identity(&all, "f").id, "s");

    let no_sub = jwt(&json!({ "sub": "", "id": "i", "userId": "u" }));
    assert_eq!(resolve_identity(&no_sub, "f").id, "i");

    let numeric = jwt(&json!({ "userId": 42 }));
    assert_eq!(resolve_identity(&numeric, "f").id, "42");

    let none = jwt(&json!({ "role": "admin" }));
    let resolved = resolve_identity(&none, "f@x.com");
    assert_eq!(resolved.id, "f@x.com");
    assert_eq!(resolved.role, "admin");
}

#[test]
fn padded_standard_base64_payload_decodes() {
    let payload = STANDARD.encode(json!({ "sub": "u1", "firstName": "Ada" }).to_string());
    let token = format!("h.{payload}.s");
    let claims = decode_token(&token).unwrap();
    assert_eq!(claims.subject().as_deref(), Some("u1"));
    assert_eq!(claims.first_name.as_deref(), Some("Ada"));
}

#[test]
fn decode_errors_are_distinct() {
    assert_eq!(decode_token("a.b"), Err(DecodeError::Segments(2)));
    assert!(matches!(decode_token("a.!!!.c"), Err(DecodeError::Base64(_))));
    let not_utf8 = URL_SAFE_NO_PAD.encode([0xff, 0xfe, 0xfd]);
    assert_eq!(decode_token(&format!("a.{not_utf8}.c")), Err(DecodeError::Utf8));
    let not_json = URL_SAFE_NO_PAD.encode("hello");
    assert!(matches!(
        decode_token(&format!("a.{not_json}.c")),
        Err(DecodeError::Json(_))
    ));
}

// =============================================================================
// Expiry
// =============================================================================

#[test]
fn past_exp_clears_session() {
    let resolver = IdentityResolver::new(MemoryTokenStore::new());
    let token = jwt(&json!({ "sub": "u1", "exp": 1_700_000_000 }));
    resolver.begin_session(&token, &identity("u1", "a@b.com")).unwrap();

    assert!(!resolver.is_token_valid_at(&token, 1_700_000_001.0));
    assert!(resolver.store().get(AUTH_TOKEN_KEY).is_none());
    assert!(resolver.store().get(USER_DATA_KEY).is_none());
    assert!(!resolver.is_token_valid_at(&token, 1_700_000_001.0));
}

#[test]
fn future_exp_keeps_session() {
    let resolver = IdentityResolver::new(MemoryTokenStore::new());
    let token = jwt(&json!({ "sub": "u1", "exp": 1_700_000_000.5 }));
    resolver.begin_session(&token, &identity("u1", "a@b.com")).unwrap();

    assert!(resolver.is_token_valid_at(&token, 1_699_999_999.0));
    assert_eq!(resolver.store().get(AUTH_TOKEN_KEY).as_deref(), Some(token.as_str()));
    assert!(resolver.store().get(USER_DATA_KEY).is_some());
}

#[test]
fn undecodable_token_counts_as_valid() {
    let resolver = IdentityResolver::new(MemoryTokenStore::new());
    resolver.begin_session("opaque-token", &identity("u1", "a@b.com")).unwrap();
    assert!(resolver.is_token_valid("opaque-token"));
    assert_eq!(resolver.check_session(), SessionState::Active);
}

// =============================================================================
// Ownership
// =============================================================================

#[test]
fn ownership_cases() {
    let me = identity("u1", "x@y.com");
    assert!(is_owner("u1", None, &me));
    assert!(is_owner("x@y.com", None, &me));
    assert!(is_owner("other", Some("x@y.com"), &me));
    assert!(!is_owner("other", Some("z@y.com"), &me));
    assert!(!is_owner("other", None, &me));
}

#[test]
fn empty_identity_owns_nothing() {
    let nobody = Identity::default();
    assert!(!is_owner("", None, &nobody));
    assert!(!is_owner("", Some(""), &nobody));
}

// =============================================================================
// Login responses
// =============================================================================

#[test]
fn login_response_shapes() {
    assert_eq!(parse_login_response(&json!("tok")).unwrap(), "tok");
    assert_eq!(parse_login_response(&json!({ "token": "a" })).unwrap(), "a");
    assert_eq!(
        parse_login_response(&json!({ "access_token": "b", "token_type": "bearer" })).unwrap(),
        "b"
    );
    assert_eq!(parse_login_response(&json!({ "accessToken": "c" })).unwrap(), "c");
    assert_eq!(
        parse_login_response(&json!({ "token": "first", "accessToken": "second" })).unwrap(),
        "first"
    );
}

#[test]
fn login_response_rejections() {
    assert_eq!(parse_login_response(&json!("")), Err(LoginParseError::EmptyToken));
    assert!(parse_login_response(&json!({ "user": {} })).is_err());
    assert!(parse_login_response(&json!([1, 2])).is_err());
    assert!(parse_login_response(&json!(null)).is_err());
}

// =============================================================================
// File-backed sessions
// =============================================================================

#[test]
fn file_session_survives_new_resolver() {
    let path = temp_session_path("survives");
    let token = jwt(&json!({ "sub": "u7", "email": "u7@x.com" }));
    {
        let resolver = IdentityResolver::new(FileTokenStore::new(&path));
        resolver
            .begin_session(&token, &identity("u7", "u7@x.com"))
            .unwrap();
    }

    let reopened = IdentityResolver::new(FileTokenStore::new(&path));
    assert_eq!(reopened.check_session(), SessionState::Active);
    assert_eq!(reopened.current_identity().unwrap().id, "u7");
    assert_eq!(reopened.bearer_token().as_deref(), Some(token.as_str()));

    reopened.end_session();
    let again = IdentityResolver::new(FileTokenStore::new(&path));
    assert_eq!(again.check_session(), SessionState::Missing);
    assert!(again.current_identity().is_none());
}

#[test]
fn expired_file_session_is_removed_from_disk() {
    let path = temp_session_path("expired");
    let token = jwt(&json!({ "sub": "u1", "exp": 10 }));
    let resolver = IdentityResolver::new(FileTokenStore::new(&path));
    resolver.begin_session(&token, &identity("u1", "a@b.com")).unwrap();

    assert_eq!(resolver.check_session(), SessionState::Expired);

    let contents = std::fs::read_to_string(&path).unwrap();
    let map: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert!(map.get(AUTH_TOKEN_KEY).is_none());
    assert!(map.get(USER_DATA_KEY).is_none());
}

#[test]
fn corrupt_session_file_reads_as_signed_out() {
    let path = temp_session_path("corrupt");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    let resolver = IdentityResolver::new(FileTokenStore::new(&path));
    assert_eq!(resolver.check_session(), SessionState::Missing);

    resolver.begin_session("tok", &identity("u1", "a@b.com")).unwrap();
    assert_eq!(resolver.bearer_token().as_deref(), Some("tok"));
}
