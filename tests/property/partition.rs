//! Property-based tests for the board's column partition.
//!
//! Uses proptest to verify:
//! 1. Column totals always equal the number of tasks, for any mix of
//!    statuses and completion flags, including empty lists.
//! 2. Every task lands in the column its fields dictate.
//! 3. A failed transition leaves the partition exactly as it was.

use proptest::prelude::*;
use taskboard::api::memory::MemoryTaskService;
use taskboard::board::{Column, Columns, DragDrop, DropLocation, TaskBoard};
use taskboard::notify::TracingNotifier;
use taskboard_proto::task::{Task, TaskStatus};

// --- Strategies ---

/// Strategy for statuses, weighted towards the three known ones but also
/// producing arbitrary unrecognised strings.
fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        3 => Just(TaskStatus::NotStarted),
        3 => Just(TaskStatus::InProgress),
        3 => Just(TaskStatus::Completed),
        1 => "[A-Za-z ]{0,12}".prop_map(|s| TaskStatus::parse(&s)),
    ]
}

/// Strategy for task lists with unique ids and independent completion flags.
fn arb_tasks() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec((arb_status(), any::<bool>()), 0..40).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (status, completed))| {
                let mut task = Task::new(format!("t{i}"), format!("Task {i}"));
                task.status = status;
                task.completed = completed;
                task
            })
            .collect()
    })
}

fn arb_column() -> impl Strategy<Value = Column> {
    prop_oneof![
        Just(Column::NotStarted),
        Just(Column::InProgress),
        Just(Column::Completed),
    ]
}

// --- Properties ---

proptest! {
    #[test]
    fn totals_equal_task_count(tasks in arb_tasks()) {
        let columns = Columns::partition(&tasks);
        let sum: usize = Column::ALL.iter().map(|c| columns.len(*c)).sum();
        prop_assert_eq!(sum, tasks.len());
        prop_assert_eq!(columns.total(), tasks.len());
    }

    #[test]
    fn every_task_lands_in_its_bucket(tasks in arb_tasks()) {
        let columns = Columns::partition(&tasks);
        for task in &tasks {
            let (column, _) = columns.position(&task.id).unwrap();
            let expected = if task.completed || task.status == TaskStatus::Completed {
                Column::Completed
            } else if task.status == TaskStatus::InProgress {
                Column::InProgress
            } else {
                Column::NotStarted
            };
            prop_assert_eq!(column, expected);
        }
    }

    #[test]
    fn failed_transition_is_fully_undone(
        tasks in arb_tasks().prop_filter("need a task", |t| !t.is_empty()),
        pick in any::<prop::sample::Index>(),
        target in arb_column(),
        slot in 0usize..50,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let service = MemoryTaskService::new(tasks.clone());
        service.set_failing(true);
        let board = TaskBoard::new(service, TracingNotifier, &tasks);
        let before = board.columns();

        let task = &tasks[pick.index(tasks.len())];
        let (source, index) = before.position(&task.id).unwrap();
        let request = DragDrop {
            task_id: task.id.clone(),
            source: DropLocation::new(source, index),
            destination: Some(DropLocation::new(target, slot)),
        };
        runtime.block_on(board.drop_task(request));

        if source == target {
            prop_assert_eq!(board.total(), tasks.len());
        } else {
            prop_assert_eq!(board.columns(), before);
        }
        prop_assert!(!board.is_pending(&task.id));
    }
}
