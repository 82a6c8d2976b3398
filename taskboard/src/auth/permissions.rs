//! Ownership and role predicates over the resolved identity.
//!
//! These gate which affordances are offered. They are not an access
//! control layer.

use taskboard_proto::identity::Identity;
use taskboard_proto::task::Task;

/// Whether `identity` owns a resource owned by `owner_id` / `owner_email`.
///
/// True when any of these hold:
/// 1. `identity.id == owner_id`
/// 2. `identity.email == owner_id` (servers that use the email as the id)
/// 3. `identity.email == owner_email`
///
/// The fallbacks paper over the server and the client disagreeing on which
/// identifier scheme a resource uses. Empty values never match.
#[must_use]
pub fn is_owner(owner_id: &str, owner_email: Option<&str>, identity: &Identity) -> bool {
    let matches = |a: &str, b: &str| !a.is_empty() && a == b;

    matches(owner_id, &identity.id)
        || matches(owner_id, &identity.email)
        || owner_email.is_some_and(|email| matches(email, &identity.email))
}

/// Whether `identity` created `task`.
#[must_use]
pub fn is_creator(task: &Task, identity: &Identity) -> bool {
    task.created_by
        .as_deref()
        .is_some_and(|creator| !creator.is_empty() && creator == identity.id)
}

/// Whether `task` is assigned to `identity` directly (team assignment does
/// not count).
#[must_use]
pub fn is_assignee(task: &Task, identity: &Identity) -> bool {
    task.user_id
        .as_deref()
        .is_some_and(|user| !user.is_empty() && user == identity.id)
}
