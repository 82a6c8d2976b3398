//! Optimistic transitions over the column partition.
//!
//! Every transition runs in two phases. Phase 1 applies the move locally
//! under the state lock and keeps an [`UndoRecord`]. Phase 2 awaits the
//! remote call with the lock released, then either drops the record or
//! replays it. Refreshes bump a generation counter; an undo record from an
//! older generation is discarded instead of replayed.

use parking_lot::Mutex;
use taskboard_proto::task::{StatusPatch, Task, TaskId};
use tokio::sync::mpsc;

use crate::api::{ApiError, TaskMutations};
use crate::notify::{NotificationKind, Notifier};

use super::pending::{PendingGuard, PendingSet};
use super::{BoardEvent, Column, Columns, DragDrop, PendingOp, TransitionOutcome};

/// Mutable board state, guarded by a single mutex.
#[derive(Debug, Default)]
pub(super) struct BoardState {
    pub(super) columns: Columns,
    pub(super) pending: PendingSet,
    pub(super) generation: u64,
}

/// Where a task was before an optimistic move.
#[derive(Debug)]
struct UndoRecord {
    original: Task,
    column: Column,
    index: usize,
    generation: u64,
}

/// A kanban board that persists transitions through `M` and reports them
/// through `N`.
pub struct TaskBoard<M: TaskMutations, N: Notifier> {
    mutations: M,
    notifier: N,
    state: Mutex<BoardState>,
    events: Option<mpsc::Sender<BoardEvent>>,
}

impl<M: TaskMutations, N: Notifier> TaskBoard<M, N> {
    /// Creates a board over `tasks`.
    pub fn new(mutations: M, notifier: N, tasks: &[Task]) -> Self {
        Self {
            mutations,
            notifier,
            state: Mutex::new(BoardState {
                columns: Columns::partition(tasks),
                ..BoardState::default()
            }),
            events: None,
        }
    }

    /// Creates a board that reports [`BoardEvent`]s on a channel holding up
    /// to `buffer` events.
    pub fn with_events(
        mutations: M,
        notifier: N,
        tasks: &[Task],
        buffer: usize,
    ) -> (Self, mpsc::Receiver<BoardEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let mut board = Self::new(mutations, notifier, tasks);
        board.events = Some(tx);
        (board, rx)
    }

    /// Replaces the task list with an authoritative one from the server.
    ///
    /// Optimistic state is discarded. Operations still in flight keep their
    /// pending entries but will not roll back over the new list.
    pub fn set_tasks(&self, tasks: &[Task]) {
        let columns = Columns::partition(tasks);
        let mut state = self.state.lock();
        state.columns = columns;
        state.generation += 1;
        tracing::debug!(
            total = tasks.len(),
            generation = state.generation,
            "board refreshed"
        );
    }

    /// Snapshot of all columns.
    #[must_use]
    pub fn columns(&self) -> Columns {
        self.state.lock().columns.clone()
    }

    /// Snapshot of one column.
    #[must_use]
    pub fn column(&self, column: Column) -> Vec<Task> {
        self.state.lock().columns.get(column).to_vec()
    }

    /// Number of tasks in `column`.
    #[must_use]
    pub fn count(&self, column: Column) -> usize {
        self.state.lock().columns.len(column)
    }

    /// Number of tasks on the board.
    #[must_use]
    pub fn total(&self) -> usize {
        self.state.lock().columns.total()
    }

    /// The operation in flight for `task_id`, if any.
    #[must_use]
    pub fn pending(&self, task_id: &TaskId) -> Option<PendingOp> {
        self.state.lock().pending.get(task_id)
    }

    /// Whether `task_id` has an operation in flight.
    #[must_use]
    pub fn is_pending(&self, task_id: &TaskId) -> bool {
        self.state.lock().pending.contains(task_id)
    }

    /// Applies a drag-and-drop gesture.
    pub async fn drop_task(&self, request: DragDrop) -> TransitionOutcome {
        let Some(destination) = request.destination else {
            return TransitionOutcome::NoOp;
        };
        let source = request.source;
        let task_id = request.task_id;
        if source == destination {
            return TransitionOutcome::NoOp;
        }

        let undo = {
            let mut state = self.state.lock();
            let Some((column, index)) = state.columns.position(&task_id) else {
                return TransitionOutcome::NoOp;
            };
            if column != source.column {
                tracing::debug!(%task_id, %column, source = %source.column, "drag source mismatch");
                return TransitionOutcome::NoOp;
            }
            if state.pending.contains(&task_id) {
                tracing::debug!(%task_id, "drop ignored, operation in flight");
                return TransitionOutcome::Rejected;
            }
            if destination.column == column {
                state.columns.reorder(column, index, destination.index);
                tracing::debug!(%task_id, %column, from = index, to = destination.index, "reordered");
                return TransitionOutcome::Reordered;
            }
            Self::apply_move(&mut state, &task_id, PendingOp::Updating, destination.column, destination.index)
        };
        let Some(undo) = undo else {
            return TransitionOutcome::NoOp;
        };
        let _guard = PendingGuard::new(&self.state, task_id.clone());

        let target = destination.column;
        tracing::info!(%task_id, from = %undo.column, to = %target, "moving task");
        let result = if target == Column::Completed {
            self.mutations.mark_complete(&task_id).await
        } else {
            self.mutations
                .update_status(&task_id, &StatusPatch::status(target.status()))
                .await
        };
        self.settle(&task_id, undo, result, &format!("Task moved to {target}"))
    }

    /// Marks a task complete, independent of any drag.
    pub async fn complete_task(&self, task_id: &TaskId) -> TransitionOutcome {
        let undo = {
            let mut state = self.state.lock();
            let Some((column, _)) = state.columns.position(task_id) else {
                return TransitionOutcome::NoOp;
            };
            if state.pending.contains(task_id) {
                tracing::debug!(%task_id, "complete ignored, operation in flight");
                return TransitionOutcome::Rejected;
            }
            if column == Column::Completed {
                return TransitionOutcome::NoOp;
            }
            let end = state.columns.len(Column::Completed);
            Self::apply_move(&mut state, task_id, PendingOp::Completing, Column::Completed, end)
        };
        let Some(undo) = undo else {
            return TransitionOutcome::NoOp;
        };
        let _guard = PendingGuard::new(&self.state, task_id.clone());

        tracing::info!(%task_id, from = %undo.column, "completing task");
        let result = self.mutations.mark_complete(task_id).await;
        self.settle(task_id, undo, result, "Task marked complete")
    }

    /// Deletes a task. It stays on the board until the server confirms.
    pub async fn delete_task(&self, task_id: &TaskId) -> TransitionOutcome {
        {
            let mut state = self.state.lock();
            if state.columns.position(task_id).is_none() {
                return TransitionOutcome::NoOp;
            }
            if !state.pending.try_insert(task_id.clone(), PendingOp::Deleting) {
                tracing::debug!(%task_id, "delete ignored, operation in flight");
                return TransitionOutcome::Rejected;
            }
        }
        let _guard = PendingGuard::new(&self.state, task_id.clone());

        tracing::info!(%task_id, "deleting task");
        match self.mutations.delete_task(task_id).await {
            Ok(()) => {
                {
                    let mut state = self.state.lock();
                    if let Some((column, index)) = state.columns.position(task_id) {
                        state.columns.remove(column, index);
                    }
                }
                self.notifier.notify(NotificationKind::Success, "Task deleted");
                self.request_refresh(task_id);
                TransitionOutcome::Deleted(task_id.clone())
            }
            Err(e) => {
                tracing::warn!(%task_id, error = %e, "delete failed");
                self.notifier
                    .notify(NotificationKind::Error, &format!("Failed to delete task: {e}"));
                TransitionOutcome::RolledBack(e)
            }
        }
    }

    /// Phase 1: moves a task to `target` with its status re-asserted and
    /// records the pending entry. Returns `None` if the task vanished.
    fn apply_move(
        state: &mut BoardState,
        task_id: &TaskId,
        op: PendingOp,
        target: Column,
        target_index: usize,
    ) -> Option<UndoRecord> {
        let (column, index) = state.columns.position(task_id)?;
        let original = state.columns.remove(column, index)?;
        let mut moved = original.clone();
        moved.set_status(target.status());
        state.columns.insert(target, target_index, moved);
        state.pending.try_insert(task_id.clone(), op);
        Some(UndoRecord {
            original,
            column,
            index,
            generation: state.generation,
        })
    }

    /// Phase 2: confirms or rolls back a move.
    fn settle(
        &self,
        task_id: &TaskId,
        undo: UndoRecord,
        result: Result<Task, ApiError>,
        success_message: &str,
    ) -> TransitionOutcome {
        match result {
            Ok(task) => {
                self.accept_server_copy(&task, undo.generation);
                self.notifier.notify(NotificationKind::Success, success_message);
                self.request_refresh(task_id);
                TransitionOutcome::Committed(task)
            }
            Err(e) => {
                tracing::warn!(%task_id, error = %e, "transition failed, rolling back");
                self.roll_back(task_id, undo);
                self.notifier
                    .notify(NotificationKind::Error, &format!("Failed to update task: {e}"));
                TransitionOutcome::RolledBack(e)
            }
        }
    }

    /// Swaps the optimistic copy for the server's, if it still belongs in the
    /// same column and no refresh intervened.
    fn accept_server_copy(&self, task: &Task, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }
        if let Some((column, index)) = state.columns.position(&task.id)
            && Column::for_task(task) == column
        {
            state.columns.replace(column, index, task.clone());
        }
    }

    fn roll_back(&self, task_id: &TaskId, undo: UndoRecord) {
        let mut state = self.state.lock();
        if state.generation != undo.generation {
            tracing::debug!(%task_id, "board refreshed since move, skipping rollback");
            return;
        }
        if let Some((column, index)) = state.columns.position(task_id) {
            state.columns.remove(column, index);
        }
        state.columns.insert(undo.column, undo.index, undo.original);
    }

    fn request_refresh(&self, task_id: &TaskId) {
        let Some(tx) = &self.events else {
            return;
        };
        let event = BoardEvent::RefreshRequested {
            task_id: task_id.clone(),
        };
        if let Err(e) = tx.try_send(event) {
            tracing::debug!(error = %e, "refresh request dropped");
        }
    }
}
