//! Task aggregate and the payloads that mutate or filter it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::UserId;

/// Category assigned to tasks created without one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Stable task identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a new random [`TaskId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Whether this status marks the task as completed.
    pub fn is_done(self) -> bool {
        matches!(self, Self::Done)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string is not a known lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task status: {0}")]
pub struct TaskStatusParseError(String);

impl FromStr for TaskStatus {
    type Err = TaskStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(TaskStatusParseError(other.to_owned())),
        }
    }
}

/// A task owned by exactly one user.
///
/// ## Invariants
/// - `user_id` is set once at creation and never changes.
/// - `completed` is derived: true iff `status == done`. Callers cannot set it.
/// - `updated_at` moves forward on every mutation and is the only
///   client-visible signal for resolving concurrent-update races.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: TaskStatus,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a fresh task for `owner` from an already-validated payload.
    pub fn create(owner: UserId, payload: CreateTaskPayload, now: DateTime<Utc>) -> Self {
        Self {
            id: TaskId::random(),
            user_id: owner,
            title: payload.title,
            description: payload.description.unwrap_or_default(),
            category: payload
                .category
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_owned()),
            status: TaskStatus::Open,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Produce the task as it stands after applying `payload`.
    ///
    /// Identity, ownership, and `created_at` are preserved; `completed` is
    /// recomputed from the effective status.
    pub fn with_update(&self, payload: UpdateTaskPayload, now: DateTime<Utc>) -> Self {
        let status = payload.status.unwrap_or(self.status);
        Self {
            id: self.id,
            user_id: self.user_id,
            title: payload.title.unwrap_or_else(|| self.title.clone()),
            description: payload
                .description
                .unwrap_or_else(|| self.description.clone()),
            category: payload.category.unwrap_or_else(|| self.category.clone()),
            status,
            completed: status.is_done(),
            created_at: self.created_at,
            updated_at: now,
        }
    }
}

/// Shape-validated input for creating a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskPayload {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Shape-validated input for updating a task. Absent fields keep their
/// current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

/// Optional clauses narrowing a task query. Owner scoping is *not* a filter:
/// it is a mandatory parameter of every query signature.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default, rename = "q")]
    pub free_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn payload(title: &str) -> CreateTaskPayload {
        CreateTaskPayload {
            title: title.to_owned(),
            description: None,
            category: None,
        }
    }

    #[test]
    fn create_applies_defaults() {
        let now = Utc::now();
        let task = Task::create(UserId::random(), payload("Buy milk"), now);
        assert_eq!(task.description, "");
        assert_eq!(task.category, DEFAULT_CATEGORY);
        assert_eq!(task.status, TaskStatus::Open);
        assert!(!task.completed);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[rstest]
    #[case(TaskStatus::Done, true)]
    #[case(TaskStatus::Open, false)]
    #[case(TaskStatus::InProgress, false)]
    fn update_derives_completed_from_status(#[case] status: TaskStatus, #[case] expected: bool) {
        let created = Utc::now();
        let task = Task::create(UserId::random(), payload("Buy milk"), created);
        let updated = task.with_update(
            UpdateTaskPayload {
                status: Some(status),
                ..UpdateTaskPayload::default()
            },
            created + chrono::Duration::seconds(5),
        );
        assert_eq!(updated.completed, expected);
        assert_eq!(updated.id, task.id);
        assert_eq!(updated.user_id, task.user_id);
        assert_eq!(updated.created_at, task.created_at);
        assert!(updated.updated_at > task.updated_at);
    }

    #[test]
    fn update_keeps_absent_fields() {
        let now = Utc::now();
        let task = Task::create(
            UserId::random(),
            CreateTaskPayload {
                title: "Buy milk".to_owned(),
                description: Some("two litres".to_owned()),
                category: Some("Errands".to_owned()),
            },
            now,
        );
        let updated = task.with_update(
            UpdateTaskPayload {
                title: Some("Buy oat milk".to_owned()),
                ..UpdateTaskPayload::default()
            },
            now,
        );
        assert_eq!(updated.title, "Buy oat milk");
        assert_eq!(updated.description, "two litres");
        assert_eq!(updated.category, "Errands");
        assert_eq!(updated.status, TaskStatus::Open);
    }

    #[test]
    fn serialises_camel_case_with_derived_completed() {
        let task = Task::create(UserId::random(), payload("Buy milk"), Utc::now());
        let value = serde_json::to_value(&task).expect("task must serialise");
        assert_eq!(value["status"], "open");
        assert_eq!(value["completed"], false);
        assert!(value.get("userId").is_some());
        assert!(value.get("createdAt").is_some());
    }

    #[rstest]
    #[case("open", Some(TaskStatus::Open))]
    #[case("in_progress", Some(TaskStatus::InProgress))]
    #[case("done", Some(TaskStatus::Done))]
    #[case("Done", None)]
    #[case("archived", None)]
    fn parses_status_strings(#[case] raw: &str, #[case] expected: Option<TaskStatus>) {
        assert_eq!(raw.parse::<TaskStatus>().ok(), expected);
    }
}
