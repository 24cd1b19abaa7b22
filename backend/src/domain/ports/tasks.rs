//! Driving ports exposed to inbound adapters for task operations.
//!
//! The owner is a required parameter on every operation; there is no way to
//! reach task data without naming the tenant it belongs to.

use async_trait::async_trait;

use crate::domain::{CreateTaskPayload, Error, Task, TaskFilter, TaskId, UpdateTaskPayload, UserId};

/// Mutating task operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TasksCommand: Send + Sync {
    /// Create a task owned by `owner`.
    async fn create(&self, owner: &UserId, payload: CreateTaskPayload) -> Result<Task, Error>;

    /// Apply `payload` to `owner`'s task `id`. Absent or foreign tasks are
    /// NotFound.
    async fn update(
        &self,
        owner: &UserId,
        id: &TaskId,
        payload: UpdateTaskPayload,
    ) -> Result<Task, Error>;

    /// Delete `owner`'s task `id`. Absent or foreign tasks are NotFound.
    async fn remove(&self, owner: &UserId, id: &TaskId) -> Result<(), Error>;
}

/// Read-side task operations, served by the search index and the store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TasksQuery: Send + Sync {
    /// Return `owner`'s tasks matching `filter`, newest update first.
    async fn list(&self, owner: &UserId, filter: &TaskFilter) -> Result<Vec<Task>, Error>;

    /// Fetch `owner`'s task `id`. Absent or foreign tasks are NotFound.
    async fn get(&self, owner: &UserId, id: &TaskId) -> Result<Task, Error>;
}
