//! Three-way partition of a task list into board columns.

use taskboard_proto::task::{STATUS_COMPLETED, STATUS_IN_PROGRESS, STATUS_NOT_STARTED, Task, TaskId, TaskStatus};

/// A board column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Tasks not yet started, plus any task with an unrecognised status.
    NotStarted,
    /// Tasks in progress.
    InProgress,
    /// Completed tasks.
    Completed,
}

impl Column {
    /// All columns in display order.
    pub const ALL: [Self; 3] = [Self::NotStarted, Self::InProgress, Self::Completed];

    /// Display name, identical to the wire status of the column.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NotStarted => STATUS_NOT_STARTED,
            Self::InProgress => STATUS_IN_PROGRESS,
            Self::Completed => STATUS_COMPLETED,
        }
    }

    /// Parses a column name. Case, spaces, dashes and underscores are
    /// ignored, and `todo`/`doing`/`done` are accepted as shorthands.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "notstarted" | "todo" => Some(Self::NotStarted),
            "inprogress" | "doing" => Some(Self::InProgress),
            "completed" | "done" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Status a task takes when dropped into this column.
    #[must_use]
    pub const fn status(self) -> TaskStatus {
        match self {
            Self::NotStarted => TaskStatus::NotStarted,
            Self::InProgress => TaskStatus::InProgress,
            Self::Completed => TaskStatus::Completed,
        }
    }

    /// The column a task belongs in.
    ///
    /// The completion flag wins over the status; unrecognised statuses land
    /// in [`Column::NotStarted`].
    #[must_use]
    pub fn for_task(task: &Task) -> Self {
        if task.is_completed() {
            Self::Completed
        } else if task.status == TaskStatus::InProgress {
            Self::InProgress
        } else {
            Self::NotStarted
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::NotStarted => 0,
            Self::InProgress => 1,
            Self::Completed => 2,
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The tasks of each column, in board order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Columns {
    lanes: [Vec<Task>; 3],
}

impl Columns {
    /// Partitions `tasks` into columns, keeping their relative order.
    #[must_use]
    pub fn partition(tasks: &[Task]) -> Self {
        let mut columns = Self::default();
        for task in tasks {
            columns.lanes[Column::for_task(task).slot()].push(task.clone());
        }
        columns
    }

    /// Tasks in `column`.
    #[must_use]
    pub fn get(&self, column: Column) -> &[Task] {
        &self.lanes[column.slot()]
    }

    /// Number of tasks in `column`.
    #[must_use]
    pub fn len(&self, column: Column) -> usize {
        self.lanes[column.slot()].len()
    }

    /// Number of tasks across all columns.
    #[must_use]
    pub fn total(&self) -> usize {
        self.lanes.iter().map(Vec::len).sum()
    }

    /// Whether the board holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.iter().all(Vec::is_empty)
    }

    /// Column and index of a task.
    #[must_use]
    pub fn position(&self, task_id: &TaskId) -> Option<(Column, usize)> {
        Column::ALL.into_iter().find_map(|column| {
            self.get(column)
                .iter()
                .position(|t| t.id == *task_id)
                .map(|index| (column, index))
        })
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn find(&self, task_id: &TaskId) -> Option<&Task> {
        self.position(task_id)
            .map(|(column, index)| &self.lanes[column.slot()][index])
    }

    /// Removes and returns the task at `index` in `column`.
    pub fn remove(&mut self, column: Column, index: usize) -> Option<Task> {
        let lane = &mut self.lanes[column.slot()];
        (index < lane.len()).then(|| lane.remove(index))
    }

    /// Inserts a task at `index` in `column`; an index past the end appends.
    pub fn insert(&mut self, column: Column, index: usize, task: Task) {
        let lane = &mut self.lanes[column.slot()];
        let index = index.min(lane.len());
        lane.insert(index, task);
    }

    /// Replaces the task at `index` in `column`, returning the old one.
    pub fn replace(&mut self, column: Column, index: usize, task: Task) -> Option<Task> {
        self.lanes[column.slot()]
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, task))
    }

    /// Moves a task within `column`. Returns false if `from` is out of range.
    pub fn reorder(&mut self, column: Column, from: usize, to: usize) -> bool {
        match self.remove(column, from) {
            Some(task) => {
                self.insert(column, to, task);
                true
            }
            None => false,
        }
    }

    /// Iterates over every task, column by column.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.lanes.iter().flatten()
    }
}
