//! Task service collaborators.
//!
//! Defines the [`TaskSource`] and [`TaskMutations`] traits the board and its
//! host depend on. Implementations:
//! - [`http::HttpTaskService`]: the REST API over `reqwest`
//! - [`memory::MemoryTaskService`]: in-process service for offline use and tests

pub mod http;
pub mod memory;

use std::future::Future;
use std::sync::Arc;

use taskboard_proto::codec::CodecError;
use taskboard_proto::task::{StatusPatch, Task, TaskId};

use crate::auth::AuthError;

/// Errors returned by task service calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No session token is available for an authenticated call.
    #[error("not signed in")]
    NotAuthenticated,
    /// The server rejected the session (HTTP 401). The session has been cleared.
    #[error("session rejected by server")]
    Unauthorized,
    /// The task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Server-provided detail, if any.
        message: String,
    },
    /// The request could not be completed.
    #[error("request failed: {0}")]
    Transport(String),
    /// The configured base URL cannot be used.
    #[error("invalid API url: {0}")]
    InvalidUrl(String),
    /// The response body did not decode.
    #[error(transparent)]
    Decode(#[from] CodecError),
    /// Session bookkeeping failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Which tasks to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskScope {
    /// Every task visible to the user.
    All,
    /// Tasks assigned to the signed-in user.
    Assigned,
    /// Tasks created by the signed-in user.
    Created,
    /// Tasks belonging to one project.
    Project(String),
}

impl std::fmt::Display for TaskScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Assigned => write!(f, "assigned"),
            Self::Created => write!(f, "created"),
            Self::Project(id) => write!(f, "project:{id}"),
        }
    }
}

/// Retrieves task lists. Used by the host, never by the board itself.
pub trait TaskSource: Send + Sync {
    /// Fetches the tasks in `scope`.
    fn fetch_tasks(
        &self,
        scope: &TaskScope,
    ) -> impl Future<Output = Result<Vec<Task>, ApiError>> + Send;
}

/// Persists task transitions initiated by the board.
pub trait TaskMutations: Send + Sync {
    /// Marks a task complete. Idempotent: always settles to `Completed`.
    fn mark_complete(&self, task_id: &TaskId)
    -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// Updates a task's status field.
    fn update_status(
        &self,
        task_id: &TaskId,
        patch: &StatusPatch,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// Deletes a task.
    fn delete_task(&self, task_id: &TaskId) -> impl Future<Output = Result<(), ApiError>> + Send;
}

impl<T: TaskSource> TaskSource for Arc<T> {
    fn fetch_tasks(
        &self,
        scope: &TaskScope,
    ) -> impl Future<Output = Result<Vec<Task>, ApiError>> + Send {
        (**self).fetch_tasks(scope)
    }
}

impl<T: TaskMutations> TaskMutations for Arc<T> {
    fn mark_complete(
        &self,
        task_id: &TaskId,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send {
        (**self).mark_complete(task_id)
    }

    fn update_status(
        &self,
        task_id: &TaskId,
        patch: &StatusPatch,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send {
        (**self).update_status(task_id, patch)
    }

    fn delete_task(&self, task_id: &TaskId) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).delete_task(task_id)
    }
}
