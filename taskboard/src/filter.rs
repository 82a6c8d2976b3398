//! Filtering and sorting for task lists.

use std::cmp::Ordering;

use chrono::{Days, NaiveDate};
use taskboard_proto::task::{Priority, Task, TaskStatus};

/// Deadline window a task must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DueWindow {
    /// Due today.
    Today,
    /// Due within the next 7 days.
    Week,
    /// Due within the next 30 days.
    Month,
    /// Past its deadline and not completed.
    Overdue,
}

/// Sort key for [`TaskQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortKey {
    /// By deadline; tasks without one sort last.
    #[default]
    Deadline,
    /// By priority, highest first.
    Priority,
    /// By creation time, newest first.
    Created,
    /// By project id.
    Project,
}

/// Sort direction for [`TaskQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortDirection {
    /// Natural order of the key.
    #[default]
    Asc,
    /// Reversed.
    Desc,
}

/// A filter and sort over a task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
    /// Case-insensitive substring of the title.
    pub search: Option<String>,
    /// Status to match. `Completed` matches the completion flag.
    pub status: Option<TaskStatus>,
    /// Exact priority.
    pub priority: Option<Priority>,
    /// Exact project id.
    pub project: Option<String>,
    /// Deadline window. Tasks without a deadline never match a window.
    pub due: Option<DueWindow>,
    /// Whether completed tasks are kept.
    pub show_completed: bool,
    /// Sort key.
    pub sort: SortKey,
    /// Sort direction.
    pub direction: SortDirection,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            priority: None,
            project: None,
            due: None,
            show_completed: true,
            sort: SortKey::default(),
            direction: SortDirection::default(),
        }
    }
}

impl TaskQuery {
    /// Returns the matching tasks, sorted. `today` anchors the due windows.
    #[must_use]
    pub fn apply(&self, tasks: &[Task], today: NaiveDate) -> Vec<Task> {
        let needle = self
            .search
            .as_deref()
            .map(str::to_lowercase)
            .filter(|s| !s.is_empty());
        let mut matched: Vec<Task> = tasks
            .iter()
            .filter(|task| self.matches(task, needle.as_deref(), today))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            let ordering = self.compare(a, b);
            match self.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        matched
    }

    fn matches(&self, task: &Task, needle: Option<&str>, today: NaiveDate) -> bool {
        if !self.show_completed && task.completed {
            return false;
        }
        if let Some(needle) = needle
            && !task.title.to_lowercase().contains(needle)
        {
            return false;
        }
        match &self.status {
            Some(TaskStatus::Completed) if !task.completed => return false,
            Some(TaskStatus::Completed) | None => {}
            Some(status) if task.status != *status => return false,
            Some(_) => {}
        }
        if self.priority.is_some_and(|p| task.priority != p) {
            return false;
        }
        if let Some(project) = &self.project
            && task.project_id.as_ref() != Some(project)
        {
            return false;
        }
        match self.due {
            None => true,
            Some(window) => task
                .deadline_date()
                .is_some_and(|deadline| in_window(window, deadline, today, task.completed)),
        }
    }

    fn compare(&self, a: &Task, b: &Task) -> Ordering {
        match self.sort {
            SortKey::Deadline => match (a.deadline_date(), b.deadline_date()) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Priority => a.priority.rank().cmp(&b.priority.rank()),
            SortKey::Created => b.created_at_time().cmp(&a.created_at_time()),
            SortKey::Project => a.project_id.cmp(&b.project_id),
        }
    }
}

fn in_window(window: DueWindow, deadline: NaiveDate, today: NaiveDate, completed: bool) -> bool {
    let within = |days: u64| {
        today
            .checked_add_days(Days::new(days))
            .is_some_and(|end| deadline >= today && deadline <= end)
    };
    match window {
        DueWindow::Today => deadline == today,
        DueWindow::Week => within(7),
        DueWindow::Month => within(30),
        DueWindow::Overdue => deadline < today && !completed,
    }
}
