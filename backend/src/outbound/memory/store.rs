//! Map-backed document store with lazy TTL eviction.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::domain::ports::{DocumentKey, DocumentStore, DocumentStoreError};

#[derive(Debug)]
struct Entry {
    document: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// In-process [`DocumentStore`]. TTL is best-effort: expired entries become
/// unreadable immediately and are evicted on the next access.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put(
        &self,
        key: &DocumentKey,
        document: &Value,
        ttl: Option<Duration>,
    ) -> Result<(), DocumentStoreError> {
        let entry = Entry {
            document: document.clone(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries
            .write()
            .await
            .insert(key.as_str().to_owned(), entry);
        Ok(())
    }

    async fn get(&self, key: &DocumentKey) -> Result<Option<Value>, DocumentStoreError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        if entries
            .get(key.as_str())
            .is_some_and(|entry| entry.is_expired(now))
        {
            entries.remove(key.as_str());
            return Ok(None);
        }
        Ok(entries.get(key.as_str()).map(|entry| entry.document.clone()))
    }

    async fn delete(&self, key: &DocumentKey) -> Result<bool, DocumentStoreError> {
        Ok(self.entries.write().await.remove(key.as_str()).is_some())
    }
}
