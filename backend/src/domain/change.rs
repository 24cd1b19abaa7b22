//! Mutation events: the audit-log record and the live-update payload.
//!
//! Every mutation produces one [`ChangeEvent`] appended to the durable change
//! log and one [`TaskUpdate`] published on the update bus. The two writes are
//! independent; losing one channel never blocks the other.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{Task, TaskId, TaskStatus, UserId};

/// Pub/sub topic carrying [`TaskUpdate`] payloads to every instance.
pub const TASK_UPDATES_TOPIC: &str = "tasks:updates";

/// Append-only stream holding the durable change log.
pub const TASK_CHANGES_STREAM: &str = "tasks:changes";

/// What a mutation did to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        })
    }
}

/// Audit-log record of a single mutation.
///
/// The recorder assigns the monotonic position (and with it the timestamp)
/// at append time, so the event itself carries none.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub action: ChangeAction,
    pub task_id: TaskId,
    pub user_id: UserId,
    pub category: String,
    pub status: TaskStatus,
    pub title: String,
}

impl ChangeEvent {
    /// Snapshot the fields worth auditing from `task`.
    pub fn for_task(action: ChangeAction, task: &Task) -> Self {
        Self {
            action,
            task_id: task.id,
            user_id: task.user_id,
            category: task.category.clone(),
            status: task.status,
            title: task.title.clone(),
        }
    }
}

/// Live-update payload carried over the bus and re-emitted to sockets.
///
/// `user_id` scopes delivery to one user's sessions; when absent the event is
/// broadcast-class and reaches every locally connected session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub action: ChangeAction,
    pub task: Task,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl TaskUpdate {
    /// Build an owner-scoped update for `task`.
    pub fn owned(action: ChangeAction, task: Task) -> Self {
        let user_id = Some(task.user_id);
        Self {
            action,
            task,
            user_id,
        }
    }
}
