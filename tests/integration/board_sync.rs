//! Integration tests for the task board: optimistic moves, rollback,
//! re-entrancy, and refresh behaviour against scripted task services.
//!
//! Verification command: `cargo test --test board_sync`

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Semaphore;

use taskboard::api::memory::MemoryTaskService;
use taskboard::api::{ApiError, TaskMutations};
use taskboard::board::{
    BoardEvent, Column, DragDrop, DropLocation, PendingOp, TaskBoard, TransitionOutcome,
};
use taskboard::notify::{ChannelNotifier, NotificationKind, TracingNotifier};
use taskboard_proto::task::{StatusPatch, Task, TaskId, TaskStatus};

// =============================================================================
// Test helpers
// =============================================================================

/// Task service whose calls block until the test releases a permit.
struct GatedService {
    gate: Semaphore,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl GatedService {
    fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    fn release(&self) {
        self.gate.add_permits(1);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn pass(&self, task_id: &TaskId) -> Result<(), ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        permit.forget();
        if self.fail.load(Ordering::SeqCst) {
            return Err(ApiError::NotFound(task_id.clone()));
        }
        Ok(())
    }
}

impl TaskMutations for GatedService {
    async fn mark_complete(&self, task_id: &TaskId) -> Result<Task, ApiError> {
        self.pass(task_id).await?;
        Ok(Task::new(task_id.clone(), "done").with_status(TaskStatus::Completed))
    }

    async fn update_status(&self, task_id: &TaskId, patch: &StatusPatch) -> Result<Task, ApiError> {
        self.pass(task_id).await?;
        let mut task = Task::new(task_id.clone(), "moved");
        patch.apply(&mut task);
        Ok(task)
    }

    async fn delete_task(&self, task_id: &TaskId) -> Result<(), ApiError> {
        self.pass(task_id).await
    }
}

fn sample_tasks() -> Vec<Task> {
    vec![
        Task::new("t1", "Design schema"),
        Task::new("t2", "Write migrations"),
        Task::new("t3", "Review PR").with_status(TaskStatus::InProgress),
        Task::new("t4", "Release").with_status(TaskStatus::Completed),
        Task::new("t5", "Triage").with_status(TaskStatus::Other("Blocked".to_string())),
    ]
}

fn drag(id: &str, from: Column, from_index: usize, to: Column, to_index: usize) -> DragDrop {
    DragDrop {
        task_id: TaskId::new(id),
        source: DropLocation::new(from, from_index),
        destination: Some(DropLocation::new(to, to_index)),
    }
}

fn column_ids<M: TaskMutations, N: taskboard::notify::Notifier>(
    board: &TaskBoard<M, N>,
    column: Column,
) -> Vec<String> {
    board
        .column(column)
        .into_iter()
        .map(|t| t.id.as_str().to_string())
        .collect()
}

/// Yields until `task_id` shows up as pending.
async fn wait_pending<M: TaskMutations, N: taskboard::notify::Notifier>(
    board: &TaskBoard<M, N>,
    task_id: &TaskId,
) {
    while !board.is_pending(task_id) {
        tokio::task::yield_now().await;
    }
}

// =============================================================================
// Partition
// =============================================================================

#[test]
fn initial_partition_counts_every_task() {
    let board = TaskBoard::new(
        MemoryTaskService::new(sample_tasks()),
        TracingNotifier,
        &sample_tasks(),
    );
    assert_eq!(board.count(Column::NotStarted), 3);
    assert_eq!(board.count(Column::InProgress), 1);
    assert_eq!(board.count(Column::Completed), 1);
    assert_eq!(board.total(), 5);
    assert_eq!(
        column_ids(&board, Column::NotStarted),
        ["t1", "t2", "t5"]
    );
}

// =============================================================================
// Rollback
// =============================================================================

#[tokio::test]
async fn failed_move_restores_original_column_and_order() {
    let service = Arc::new(MemoryTaskService::new(sample_tasks()));
    service.set_failing(true);
    let (notifier, mut notes) = ChannelNotifier::new(8);
    let board = TaskBoard::new(Arc::clone(&service), notifier, &sample_tasks());

    let outcome = board
        .drop_task(drag("t2", Column::NotStarted, 1, Column::InProgress, 0))
        .await;

    let TransitionOutcome::RolledBack(err) = outcome else {
        panic!("expected rollback, got {outcome:?}");
    };
    assert!(matches!(err, ApiError::Status { status: 503, .. }));
    assert_eq!(column_ids(&board, Column::NotStarted), ["t1", "t2", "t5"]);
    assert_eq!(column_ids(&board, Column::InProgress), ["t3"]);
    assert!(!board.is_pending(&TaskId::new("t2")));

    let restored = &board.column(Column::NotStarted)[1];
    assert_eq!(restored.status, TaskStatus::NotStarted);
    assert!(!restored.completed);

    let note = notes.try_recv().unwrap();
    assert_eq!(note.kind, NotificationKind::Error);
}

#[tokio::test]
async fn failed_move_of_unrecognised_status_restores_raw_status() {
    let service = Arc::new(MemoryTaskService::new(sample_tasks()));
    service.set_failing(true);
    let board = TaskBoard::new(Arc::clone(&service), TracingNotifier, &sample_tasks());

    board
        .drop_task(drag("t5", Column::NotStarted, 2, Column::Completed, 0))
        .await;

    let restored = &board.column(Column::NotStarted)[2];
    assert_eq!(restored.status, TaskStatus::Other("Blocked".to_string()));
}

#[tokio::test]
async fn optimistic_state_is_visible_while_call_is_in_flight() {
    let service = Arc::new(GatedService::new());
    let board = TaskBoard::new(Arc::clone(&service), TracingNotifier, &sample_tasks());
    let id = TaskId::new("t1");

    let moving = board.drop_task(drag("t1", Column::NotStarted, 0, Column::Completed, 0));
    let observe = async {
        wait_pending(&board, &id).await;
        assert_eq!(board.pending(&id), Some(PendingOp::Updating));
        let done = board.column(Column::Completed);
        assert_eq!(done[0].id, id);
        assert!(done[0].completed);
        assert_eq!(board.total(), 5);
        service.release();
    };
    let (outcome, ()) = tokio::join!(moving, observe);
    assert!(outcome.is_committed());
    assert!(!board.is_pending(&id));
}

// =============================================================================
// Same-column drops
// =============================================================================

#[tokio::test]
async fn same_column_drop_reorders_without_remote_call() {
    let service = Arc::new(GatedService::new());
    let board = TaskBoard::new(Arc::clone(&service), TracingNotifier, &sample_tasks());

    let outcome = board
        .drop_task(drag("t1", Column::NotStarted, 0, Column::NotStarted, 2))
        .await;

    assert!(matches!(outcome, TransitionOutcome::Reordered));
    assert_eq!(column_ids(&board, Column::NotStarted), ["t2", "t5", "t1"]);
    assert_eq!(board.total(), 5);
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn drop_without_destination_is_noop() {
    let service = Arc::new(GatedService::new());
    let board = TaskBoard::new(Arc::clone(&service), TracingNotifier, &sample_tasks());
    let outcome = board
        .drop_task(DragDrop {
            task_id: TaskId::new("t1"),
            source: DropLocation::new(Column::NotStarted, 0),
            destination: None,
        })
        .await;
    assert!(matches!(outcome, TransitionOutcome::NoOp));
    assert_eq!(service.calls(), 0);
}

// =============================================================================
// Re-entrancy
// =============================================================================

#[tokio::test]
async fn second_transition_while_pending_is_rejected() {
    let service = Arc::new(GatedService::new());
    let board = TaskBoard::new(Arc::clone(&service), TracingNotifier, &sample_tasks());
    let id = TaskId::new("t3");

    let first = board.drop_task(drag("t3", Column::InProgress, 0, Column::Completed, 0));
    let second = async {
        wait_pending(&board, &id).await;
        let before = board.columns();

        let drag_again = board
            .drop_task(drag("t3", Column::Completed, 0, Column::NotStarted, 0))
            .await;
        let complete = board.complete_task(&id).await;
        let delete = board.delete_task(&id).await;

        assert_eq!(board.columns(), before);
        service.release();
        (drag_again, complete, delete)
    };

    let (first, (drag_again, complete, delete)) = tokio::join!(first, second);
    assert!(first.is_committed());
    assert!(matches!(drag_again, TransitionOutcome::Rejected));
    assert!(matches!(complete, TransitionOutcome::Rejected));
    assert!(matches!(delete, TransitionOutcome::Rejected));
    assert_eq!(service.calls(), 1);
}

#[tokio::test]
async fn other_tasks_proceed_while_one_is_pending() {
    let service = Arc::new(GatedService::new());
    let board = TaskBoard::new(Arc::clone(&service), TracingNotifier, &sample_tasks());
    let first_id = TaskId::new("t1");
    let second_id = TaskId::new("t2");

    let first = board.complete_task(&first_id);
    let second = async {
        wait_pending(&board, &first_id).await;
        let op = board.complete_task(&second_id);
        let release = async {
            wait_pending(&board, &second_id).await;
            service.release();
            service.release();
        };
        let (outcome, ()) = tokio::join!(op, release);
        outcome
    };

    let (a, b) = tokio::join!(first, second);
    assert!(a.is_committed());
    assert!(b.is_committed());
    assert_eq!(board.count(Column::Completed), 3);
    assert_eq!(service.calls(), 2);
}

#[tokio::test]
async fn dropping_the_operation_future_releases_pending() {
    let service = Arc::new(GatedService::new());
    let board = TaskBoard::new(Arc::clone(&service), TracingNotifier, &sample_tasks());
    let id = TaskId::new("t1");

    {
        let op = board.complete_task(&id);
        tokio::pin!(op);
        let polled = tokio::time::timeout(std::time::Duration::from_millis(20), &mut op).await;
        assert!(polled.is_err());
        assert!(board.is_pending(&id));
    }

    assert!(!board.is_pending(&id));
    // Optimistic state stays until the next refresh.
    assert_eq!(board.column(Column::Completed)[1].id, id);
    board.set_tasks(&sample_tasks());
    assert_eq!(board.count(Column::Completed), 1);
}

// =============================================================================
// Complete and delete
// =============================================================================

#[tokio::test]
async fn complete_task_persists_both_fields() {
    let service = Arc::new(MemoryTaskService::new(sample_tasks()));
    let board = TaskBoard::new(Arc::clone(&service), TracingNotifier, &sample_tasks());

    let outcome = board.complete_task(&TaskId::new("t3")).await;
    let TransitionOutcome::Committed(task) = outcome else {
        panic!("expected commit, got {outcome:?}");
    };
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(task.completed);
    assert_eq!(column_ids(&board, Column::Completed), ["t4", "t3"]);
    assert_eq!(board.count(Column::InProgress), 0);
}

#[tokio::test]
async fn complete_unknown_task_is_noop() {
    let service = Arc::new(MemoryTaskService::new(sample_tasks()));
    let board = TaskBoard::new(Arc::clone(&service), TracingNotifier, &sample_tasks());
    let outcome = board.complete_task(&TaskId::new("missing")).await;
    assert!(matches!(outcome, TransitionOutcome::NoOp));
    assert_eq!(service.mutation_calls(), 0);
}

#[tokio::test]
async fn delete_keeps_task_visible_until_confirmed() {
    let service = Arc::new(GatedService::new());
    let board = TaskBoard::new(Arc::clone(&service), TracingNotifier, &sample_tasks());
    let id = TaskId::new("t4");

    let deleting = board.delete_task(&id);
    let observe = async {
        wait_pending(&board, &id).await;
        assert_eq!(board.pending(&id), Some(PendingOp::Deleting));
        assert_eq!(board.count(Column::Completed), 1);
        service.release();
    };
    let (outcome, ()) = tokio::join!(deleting, observe);

    assert!(matches!(outcome, TransitionOutcome::Deleted(ref d) if *d == id));
    assert_eq!(board.count(Column::Completed), 0);
    assert_eq!(board.total(), 4);
}

#[tokio::test]
async fn failed_delete_leaves_board_untouched() {
    let service = Arc::new(GatedService::new());
    service.fail.store(true, Ordering::SeqCst);
    service.release();
    let (notifier, mut notes) = ChannelNotifier::new(4);
    let board = TaskBoard::new(Arc::clone(&service), notifier, &sample_tasks());
    let before = board.columns();

    let outcome = board.delete_task(&TaskId::new("t1")).await;

    assert!(matches!(
        outcome,
        TransitionOutcome::RolledBack(ApiError::NotFound(_))
    ));
    assert_eq!(board.columns(), before);
    assert_eq!(notes.try_recv().unwrap().kind, NotificationKind::Error);
}

// =============================================================================
// Refresh
// =============================================================================

#[tokio::test]
async fn refresh_during_flight_prevents_stale_rollback() {
    let service = Arc::new(GatedService::new());
    service.fail.store(true, Ordering::SeqCst);
    let board = TaskBoard::new(Arc::clone(&service), TracingNotifier, &sample_tasks());
    let id = TaskId::new("t1");

    let moving = board.drop_task(drag("t1", Column::NotStarted, 0, Column::InProgress, 0));
    let refresh = async {
        wait_pending(&board, &id).await;
        let server_view = vec![Task::new("t1", "Design schema").with_status(TaskStatus::Completed)];
        board.set_tasks(&server_view);
        service.release();
    };
    let (outcome, ()) = tokio::join!(moving, refresh);

    assert!(matches!(outcome, TransitionOutcome::RolledBack(_)));
    assert_eq!(board.total(), 1);
    assert_eq!(column_ids(&board, Column::Completed), ["t1"]);
    assert!(!board.is_pending(&id));
}

#[tokio::test]
async fn commits_request_refresh() {
    let service = Arc::new(MemoryTaskService::new(sample_tasks()));
    let (board, mut events) =
        TaskBoard::with_events(Arc::clone(&service), TracingNotifier, &sample_tasks(), 8);

    board
        .drop_task(drag("t1", Column::NotStarted, 0, Column::InProgress, 1))
        .await;
    board.delete_task(&TaskId::new("t4")).await;

    assert_eq!(
        events.try_recv().unwrap(),
        BoardEvent::RefreshRequested {
            task_id: TaskId::new("t1")
        }
    );
    assert_eq!(
        events.try_recv().unwrap(),
        BoardEvent::RefreshRequested {
            task_id: TaskId::new("t4")
        }
    );
}

#[tokio::test]
async fn rollback_does_not_request_refresh() {
    let service = Arc::new(MemoryTaskService::new(sample_tasks()));
    service.set_failing(true);
    let (board, mut events) =
        TaskBoard::with_events(Arc::clone(&service), TracingNotifier, &sample_tasks(), 8);
    board.complete_task(&TaskId::new("t1")).await;
    assert!(events.try_recv().is_err());
}
