//! In-process task service.
//!
//! Keeps tasks in memory behind the same traits as the REST client, so the
//! board can run offline and tests can drive both success and failure paths.
//! Deletes are soft: the task is hidden from every scope but kept.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;
use taskboard_proto::task::{StatusPatch, Task, TaskId};

use super::{ApiError, TaskMutations, TaskScope, TaskSource};

#[derive(Debug, Clone)]
struct StoredTask {
    task: Task,
    deleted: bool,
}

/// Task service backed by an in-memory list.
#[derive(Debug, Default)]
pub struct MemoryTaskService {
    tasks: RwLock<Vec<StoredTask>>,
    current_user: Option<String>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryTaskService {
    /// Creates a service holding `tasks`, in order.
    #[must_use]
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: RwLock::new(
                tasks
                    .into_iter()
                    .map(|task| StoredTask {
                        task,
                        deleted: false,
                    })
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Sets the user that `Assigned` and `Created` scopes are resolved against.
    #[must_use]
    pub fn with_current_user(mut self, user_id: impl Into<String>) -> Self {
        self.current_user = Some(user_id.into());
        self
    }

    /// While set, every mutation fails with a 503 status error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of mutation calls received, successful or not.
    #[must_use]
    pub fn mutation_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns a stored task, including soft-deleted ones.
    #[must_use]
    pub fn get(&self, task_id: &TaskId) -> Option<Task> {
        self.tasks
            .read()
            .iter()
            .find(|s| s.task.id == *task_id)
            .map(|s| s.task.clone())
    }

    /// Whether a task has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self, task_id: &TaskId) -> bool {
        self.tasks
            .read()
            .iter()
            .any(|s| s.task.id == *task_id && s.deleted)
    }

    fn begin_mutation(&self) -> Result<(), ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn modify(&self, task_id: &TaskId, patch: &StatusPatch) -> Result<Task, ApiError> {
        self.begin_mutation()?;
        let mut tasks = self.tasks.write();
        let stored = tasks
            .iter_mut()
            .find(|s| s.task.id == *task_id && !s.deleted)
            .ok_or_else(|| ApiError::NotFound(task_id.clone()))?;
        patch.apply(&mut stored.task);
        Ok(stored.task.clone())
    }

    fn in_scope(&self, task: &Task, scope: &TaskScope) -> bool {
        let me = self.current_user.as_deref();
        match scope {
            TaskScope::All => true,
            TaskScope::Assigned => me.is_some() && task.user_id.as_deref() == me,
            TaskScope::Created => me.is_some() && task.created_by.as_deref() == me,
            TaskScope::Project(project) => task.project_id.as_deref() == Some(project.as_str()),
        }
    }
}

impl TaskSource for MemoryTaskService {
    async fn fetch_tasks(&self, scope: &TaskScope) -> Result<Vec<Task>, ApiError> {
        Ok(self
            .tasks
            .read()
            .iter()
            .filter(|s| !s.deleted && self.in_scope(&s.task, scope))
            .map(|s| s.task.clone())
            .collect())
    }
}

impl TaskMutations for MemoryTaskService {
    async fn mark_complete(&self, task_id: &TaskId) -> Result<Task, ApiError> {
        self.modify(task_id, &StatusPatch::completion())
    }

    async fn update_status(&self, task_id: &TaskId, patch: &StatusPatch) -> Result<Task, ApiError> {
        self.modify(task_id, patch)
    }

    async fn delete_task(&self, task_id: &TaskId) -> Result<(), ApiError> {
        self.begin_mutation()?;
        let mut tasks = self.tasks.write();
        let stored = tasks
            .iter_mut()
            .find(|s| s.task.id == *task_id && !s.deleted)
            .ok_or_else(|| ApiError::NotFound(task_id.clone()))?;
        stored.deleted = true;
        Ok(())
    }
}
