//! Port abstraction for the key-addressed JSON document store.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{TaskId, UserId};

/// Kind-prefixed storage key.
///
/// ## Invariants
/// - Every key carries an entity-kind prefix (`task:`, `user:`, `token:`), so
///   distinct entity kinds never collide in the shared keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey(String);

impl DocumentKey {
    /// Key addressing a task document.
    pub fn for_task(id: &TaskId) -> Self {
        Self(format!("task:{id}"))
    }

    /// Key addressing a user document.
    pub fn for_user(id: &UserId) -> Self {
        Self(format!("user:{id}"))
    }

    /// Key addressing a token session document. Tokens are addressed by
    /// their own opaque value.
    pub fn for_token(token: &str) -> Self {
        Self(format!("token:{token}"))
    }

    /// The raw namespaced key.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by document store adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentStoreError {
    /// Store connection could not be established.
    #[error("document store connection failed: {message}")]
    Connection { message: String },
    /// Command or payload handling failed during execution.
    #[error("document store backend failure: {message}")]
    Backend { message: String },
}

impl DocumentStoreError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Key-addressed storage for JSON-shaped entities with best-effort TTL.
///
/// `get` of an absent or expired key is `Ok(None)`, never an error. A TTL
/// guarantees the document is inaccessible after expiry but not exact-time
/// deletion. There are no cross-key transactions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write `document` under `key`, replacing any previous value.
    async fn put(
        &self,
        key: &DocumentKey,
        document: &Value,
        ttl: Option<Duration>,
    ) -> Result<(), DocumentStoreError>;

    /// Read the document stored under `key`.
    async fn get(&self, key: &DocumentKey) -> Result<Option<Value>, DocumentStoreError>;

    /// Remove the document under `key`, reporting whether one existed.
    async fn delete(&self, key: &DocumentKey) -> Result<bool, DocumentStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_kind_prefixed() {
        let task = TaskId::random();
        let user = UserId::random();
        assert_eq!(
            DocumentKey::for_task(&task).as_str(),
            format!("task:{task}")
        );
        assert_eq!(
            DocumentKey::for_user(&user).as_str(),
            format!("user:{user}")
        );
        assert_eq!(DocumentKey::for_token("abc").as_str(), "token:abc");
    }
}
