//! `taskboard`: kanban client for the project-management REST API.
//!
//! Resolves the signed-in identity from a stored bearer token and keeps a
//! three-column task board in sync with the server through optimistic,
//! reversible transitions.

pub mod api;
pub mod auth;
pub mod board;
pub mod config;
pub mod filter;
pub mod notify;
