//! Kanban board over a task list.
//!
//! [`TaskBoard`] groups tasks into three [`Column`]s and applies transitions
//! optimistically: the local move happens first, the remote call second, and
//! a failed call replays the inverse move. Each task has at most one
//! mutation in flight; further attempts are rejected until it resolves.

pub mod columns;
pub mod pending;
pub mod synchronizer;

pub use columns::{Column, Columns};
pub use pending::PendingSet;
pub use synchronizer::TaskBoard;

use taskboard_proto::task::{Task, TaskId};

use crate::api::ApiError;

/// Kind of mutation in flight for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOp {
    /// A status change from a drag.
    Updating,
    /// An explicit completion.
    Completing,
    /// A delete.
    Deleting,
}

impl std::fmt::Display for PendingOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Updating => write!(f, "updating"),
            Self::Completing => write!(f, "completing"),
            Self::Deleting => write!(f, "deleting"),
        }
    }
}

/// A slot on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropLocation {
    /// Column.
    pub column: Column,
    /// Index within the column.
    pub index: usize,
}

impl DropLocation {
    /// Creates a location.
    #[must_use]
    pub const fn new(column: Column, index: usize) -> Self {
        Self { column, index }
    }
}

/// A drag-and-drop gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragDrop {
    /// Dragged task.
    pub task_id: TaskId,
    /// Where the drag started.
    pub source: DropLocation,
    /// Where it ended; `None` when dropped outside any column.
    pub destination: Option<DropLocation>,
}

/// Result of a board operation.
#[derive(Debug)]
pub enum TransitionOutcome {
    /// Nothing to do; no remote call was made.
    NoOp,
    /// Order changed within a column; no remote call was made.
    Reordered,
    /// Another operation is in flight for the task.
    Rejected,
    /// The server accepted the change.
    Committed(Task),
    /// The server deleted the task and it was removed from the board.
    Deleted(TaskId),
    /// The server call failed and the local change was undone.
    RolledBack(ApiError),
}

impl TransitionOutcome {
    /// Whether a remote call succeeded.
    #[must_use]
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_) | Self::Deleted(_))
    }
}

/// Requests from the board to its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// A mutation was committed; the host should re-fetch the task list and
    /// pass it to [`TaskBoard::set_tasks`].
    RefreshRequested {
        /// The task whose mutation triggered the request.
        task_id: TaskId,
    },
}
