//! Port abstraction for the secondary index over task documents.

use async_trait::async_trait;

use crate::domain::{Task, TaskFilter, TaskId, UserId};

/// Errors surfaced by search index adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchIndexError {
    /// Index backend is unavailable or timing out.
    #[error("search index connection failed: {message}")]
    Connection { message: String },
    /// Query or index mutation failed during execution.
    #[error("search index query failed: {message}")]
    Query { message: String },
}

impl SearchIndexError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Secondary index over stored task documents.
///
/// The owner is a mandatory parameter of [`SearchIndex::query`] rather than
/// an optional filter clause, so tenant isolation cannot be omitted by
/// mistake. A free-text value that cannot be expressed safely fails closed
/// to empty results instead of erroring.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Bootstrap the index schema. Idempotent: bootstrapping an existing
    /// index is not an error.
    async fn ensure(&self) -> Result<(), SearchIndexError>;

    /// Reflect the latest write of `task` in the index.
    async fn index(&self, task: &Task) -> Result<(), SearchIndexError>;

    /// Drop the entry for `id` from the index.
    async fn remove(&self, id: &TaskId) -> Result<(), SearchIndexError>;

    /// Return `owner`'s tasks matching `filter`, ordered by `updated_at`
    /// descending with ties broken by insertion order.
    async fn query(
        &self,
        owner: &UserId,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, SearchIndexError>;
}
