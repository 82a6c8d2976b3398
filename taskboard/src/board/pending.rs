//! In-flight operation bookkeeping.

use std::collections::HashMap;

use parking_lot::Mutex;
use taskboard_proto::task::TaskId;

use super::PendingOp;
use super::synchronizer::BoardState;

/// Tasks with a mutation in flight. At most one entry per task.
#[derive(Debug, Default)]
pub struct PendingSet {
    ops: HashMap<TaskId, PendingOp>,
}

impl PendingSet {
    /// The operation in flight for `task_id`, if any.
    #[must_use]
    pub fn get(&self, task_id: &TaskId) -> Option<PendingOp> {
        self.ops.get(task_id).copied()
    }

    /// Whether `task_id` has an operation in flight.
    #[must_use]
    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.ops.contains_key(task_id)
    }

    /// Records `op` for `task_id`. Returns false if one is already recorded.
    pub fn try_insert(&mut self, task_id: TaskId, op: PendingOp) -> bool {
        if self.ops.contains_key(&task_id) {
            return false;
        }
        self.ops.insert(task_id, op);
        true
    }

    /// Clears the entry for `task_id`.
    pub fn remove(&mut self, task_id: &TaskId) -> Option<PendingOp> {
        self.ops.remove(task_id)
    }

    /// Number of operations in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Clears a task's pending entry when dropped.
///
/// Created right after the entry is recorded, with no await point in
/// between, so the entry is released on success, on failure, and when the
/// operation future is dropped mid-flight.
pub(super) struct PendingGuard<'a> {
    state: &'a Mutex<BoardState>,
    task_id: TaskId,
}

impl<'a> PendingGuard<'a> {
    pub(super) const fn new(state: &'a Mutex<BoardState>, task_id: TaskId) -> Self {
        Self { state, task_id }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Some(op) = self.state.lock().pending.remove(&self.task_id) {
            tracing::trace!(task_id = %self.task_id, %op, "pending released");
        }
    }
}
