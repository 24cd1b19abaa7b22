//! Task synchronization service: the multi-step write pipeline and the
//! indexed read path.
//!
//! A mutation walks four steps in order — document store write, index
//! update, change-log append, bus publish — with no cross-step transaction.
//! The store write is the single source of truth: recorder and bus failures
//! are logged and suppressed, while store or index failures fail the
//! request. A crash between steps can leave the index, log, or live
//! subscribers stale; `updated_at` is the client-visible signal for
//! resolving such races.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::domain::ports::{
    ChangeRecorder, DocumentKey, DocumentStore, DocumentStoreError, SearchIndex, SearchIndexError,
    TasksCommand, TasksQuery, UpdateBus,
};
use crate::domain::{
    ChangeAction, ChangeEvent, CreateTaskPayload, Error, TASK_UPDATES_TOPIC, Task, TaskFilter,
    TaskId, TaskUpdate, UpdateTaskPayload, UserId,
};

/// Retention window after which task documents self-expire. Stale data
/// cleaning itself up is a deliberate storage policy, independent of user
/// action.
pub const TASK_RETENTION: Duration = Duration::from_secs(60 * 60 * 24 * 30);

fn map_store_error(error: DocumentStoreError) -> Error {
    match error {
        DocumentStoreError::Connection { message } => {
            Error::service_unavailable(format!("document store unavailable: {message}"))
        }
        DocumentStoreError::Backend { message } => {
            Error::internal(format!("document store error: {message}"))
        }
    }
}

fn map_index_error(error: SearchIndexError) -> Error {
    match error {
        SearchIndexError::Connection { message } => {
            Error::service_unavailable(format!("search index unavailable: {message}"))
        }
        SearchIndexError::Query { message } => {
            Error::internal(format!("search index error: {message}"))
        }
    }
}

/// Service implementing the task command and query driving ports.
#[derive(Clone)]
pub struct TaskSyncService {
    store: Arc<dyn DocumentStore>,
    index: Arc<dyn SearchIndex>,
    recorder: Arc<dyn ChangeRecorder>,
    bus: Arc<dyn UpdateBus>,
    retention: Duration,
}

impl TaskSyncService {
    /// Create a service over the four infrastructure ports with the default
    /// retention window.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: Arc<dyn SearchIndex>,
        recorder: Arc<dyn ChangeRecorder>,
        bus: Arc<dyn UpdateBus>,
    ) -> Self {
        Self {
            store,
            index,
            recorder,
            bus,
            retention: TASK_RETENTION,
        }
    }

    /// Override the retention window applied to task documents.
    #[must_use]
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Load `id` from the store and surface it only when `owner` owns it.
    /// Absent, expired, and foreign-owned tasks are indistinguishable.
    async fn load_for_owner(&self, owner: &UserId, id: &TaskId) -> Result<Option<Task>, Error> {
        let Some(document) = self
            .store
            .get(&DocumentKey::for_task(id))
            .await
            .map_err(map_store_error)?
        else {
            return Ok(None);
        };
        let task: Task = serde_json::from_value(document)
            .map_err(|error| Error::internal(format!("stored task document is malformed: {error}")))?;
        Ok((task.user_id == *owner).then_some(task))
    }

    /// Write `task` to the store (refreshing its retention TTL) and reflect
    /// it in the index.
    async fn persist(&self, task: &Task) -> Result<(), Error> {
        let document = serde_json::to_value(task)
            .map_err(|error| Error::internal(format!("task document failed to serialise: {error}")))?;
        self.store
            .put(
                &DocumentKey::for_task(&task.id),
                &document,
                Some(self.retention),
            )
            .await
            .map_err(map_store_error)?;
        self.index.index(task).await.map_err(map_index_error)
    }

    /// Best-effort tail of the pipeline: append to the change log and
    /// publish on the bus. Failures here never fail the mutation.
    async fn record_and_publish(&self, action: ChangeAction, task: &Task) {
        let event = ChangeEvent::for_task(action, task);
        match self.recorder.append(&event).await {
            Ok(position) => debug!(position = %position, task = %task.id, "change recorded"),
            Err(error) => {
                warn!(error = %error, task = %task.id, "change recorder append failed; continuing");
            }
        }

        let update = TaskUpdate::owned(action, task.clone());
        match serde_json::to_string(&update) {
            Ok(payload) => {
                if let Err(error) = self.bus.publish(TASK_UPDATES_TOPIC, payload).await {
                    warn!(error = %error, task = %task.id, "update publish failed; continuing");
                }
            }
            Err(error) => {
                warn!(error = %error, task = %task.id, "update payload failed to serialise");
            }
        }
    }
}

#[async_trait]
impl TasksCommand for TaskSyncService {
    async fn create(&self, owner: &UserId, payload: CreateTaskPayload) -> Result<Task, Error> {
        let task = Task::create(*owner, payload, Utc::now());
        self.persist(&task).await?;
        self.record_and_publish(ChangeAction::Created, &task).await;
        Ok(task)
    }

    async fn update(
        &self,
        owner: &UserId,
        id: &TaskId,
        payload: UpdateTaskPayload,
    ) -> Result<Task, Error> {
        let existing = self
            .load_for_owner(owner, id)
            .await?
            .ok_or_else(|| Error::not_found("Task not found"))?;
        let updated = existing.with_update(payload, Utc::now());
        self.persist(&updated).await?;
        self.record_and_publish(ChangeAction::Updated, &updated)
            .await;
        Ok(updated)
    }

    async fn remove(&self, owner: &UserId, id: &TaskId) -> Result<(), Error> {
        let existing = self
            .load_for_owner(owner, id)
            .await?
            .ok_or_else(|| Error::not_found("Task not found"))?;
        self.store
            .delete(&DocumentKey::for_task(id))
            .await
            .map_err(map_store_error)?;
        self.index.remove(id).await.map_err(map_index_error)?;
        self.record_and_publish(ChangeAction::Deleted, &existing)
            .await;
        Ok(())
    }
}

#[async_trait]
impl TasksQuery for TaskSyncService {
    async fn list(&self, owner: &UserId, filter: &TaskFilter) -> Result<Vec<Task>, Error> {
        self.index
            .query(owner, filter)
            .await
            .map_err(map_index_error)
    }

    async fn get(&self, owner: &UserId, id: &TaskId) -> Result<Task, Error> {
        self.load_for_owner(owner, id)
            .await?
            .ok_or_else(|| Error::not_found("Task not found"))
    }
}

#[cfg(test)]
#[path = "task_service_tests.rs"]
mod tests;
