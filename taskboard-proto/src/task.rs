//! Task shapes exchanged with the project-management REST API.
//!
//! Field names follow the server's `PascalCase` JSON. Status values are
//! free-form strings on the wire; the three board statuses are recognised and
//! anything else is kept verbatim in [`TaskStatus::Other`] so that a task list
//! never fails to decode because of a status the client does not know.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Wire value of the "not started" status.
pub const STATUS_NOT_STARTED: &str = "Not Started";
/// Wire value of the "in progress" status.
pub const STATUS_IN_PROGRESS: &str = "In Progress";
/// Wire value of the "completed" status.
pub const STATUS_COMPLETED: &str = "Completed";

/// Server-assigned task identifier.
///
/// Opaque to the client: usually a UUID string, but never parsed as one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Status of a task as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    /// `"Not Started"`.
    #[default]
    NotStarted,
    /// `"In Progress"`.
    InProgress,
    /// `"Completed"`.
    Completed,
    /// Any status string the client does not recognise, preserved as sent.
    Other(String),
}

impl TaskStatus {
    /// Parses a wire status. Matching is exact, as on the server.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        Self::from(value.to_string())
    }

    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotStarted => STATUS_NOT_STARTED,
            Self::InProgress => STATUS_IN_PROGRESS,
            Self::Completed => STATUS_COMPLETED,
            Self::Other(value) => value,
        }
    }

    /// Whether this is one of the three board statuses.
    #[must_use]
    pub const fn is_recognised(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            STATUS_NOT_STARTED => Self::NotStarted,
            STATUS_IN_PROGRESS => Self::InProgress,
            STATUS_COMPLETED => Self::Completed,
            _ => Self::Other(value),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    /// `LOW`.
    Low,
    /// `MEDIUM`.
    Medium,
    /// `HIGH`.
    High,
    /// Missing or unrecognised priority.
    #[default]
    #[serde(other)]
    Unspecified,
}

impl Priority {
    /// Sort rank: `HIGH` first, unspecified last.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
            Self::Unspecified => 3,
        }
    }

    /// Parses a priority name case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "LOW" => Self::Low,
            "MEDIUM" => Self::Medium,
            "HIGH" => Self::High,
            _ => Self::Unspecified,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Unspecified => write!(f, "-"),
        }
    }
}

/// A task as returned by the REST API.
///
/// Only the fields the client reads are modelled; unknown members are
/// ignored on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Task {
    /// Server identifier.
    pub id: TaskId,
    /// Task title.
    pub title: String,
    /// Workflow status.
    #[serde(default)]
    pub status: TaskStatus,
    /// Completion flag; kept consistent with `status` by [`Task::set_status`].
    #[serde(default)]
    pub completed: bool,
    /// Priority.
    #[serde(default)]
    pub priority: Priority,
    /// Optional free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Deadline as sent by the server (ISO date or date-time).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    /// Assigned user, if assigned to a single user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Assigned team, if assigned to a team.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    /// User who created the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// Owning project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Creation time as sent by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Task {
    /// Creates a not-started task with only an id and a title.
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: TaskStatus::NotStarted,
            completed: false,
            priority: Priority::Unspecified,
            description: None,
            deadline: None,
            user_id: None,
            team_id: None,
            created_by: None,
            project_id: None,
            created_at: None,
        }
    }

    /// Builder-style status setter that keeps `completed` consistent.
    #[must_use]
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.set_status(status);
        self
    }

    /// Sets the status and re-asserts `completed == (status == Completed)`.
    pub fn set_status(&mut self, status: TaskStatus) {
        self.completed = status == TaskStatus::Completed;
        self.status = status;
    }

    /// True when either the flag or the status says the task is done.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed || self.status == TaskStatus::Completed
    }

    /// Calendar date of the deadline, if present and parseable.
    #[must_use]
    pub fn deadline_date(&self) -> Option<NaiveDate> {
        self.deadline.as_deref().and_then(parse_date_time).map(|dt| dt.date())
    }

    /// Creation time, if present and parseable.
    #[must_use]
    pub fn created_at_time(&self) -> Option<NaiveDateTime> {
        self.created_at.as_deref().and_then(parse_date_time)
    }
}

/// Body of a status update (`PUT /tasks/{id}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPatch {
    /// New status.
    #[serde(rename = "Status")]
    pub status: TaskStatus,
    /// Completion flag, sent only by the completion patch.
    #[serde(rename = "Completed", default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl StatusPatch {
    /// `{Status: <status>}`.
    #[must_use]
    pub const fn status(status: TaskStatus) -> Self {
        Self {
            status,
            completed: None,
        }
    }

    /// `{Status: "Completed", Completed: true}`.
    #[must_use]
    pub const fn completion() -> Self {
        Self {
            status: TaskStatus::Completed,
            completed: Some(true),
        }
    }

    /// Applies the patch to a local copy of a task.
    pub fn apply(&self, task: &mut Task) {
        task.set_status(self.status.clone());
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}

/// Parses the date formats the server is known to emit: RFC 3339, naive
/// ISO date-times with optional fractional seconds, and plain dates.
fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
