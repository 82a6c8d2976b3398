//! Shared data shapes for the taskboard REST boundary.

pub mod codec;
pub mod identity;
pub mod task;
