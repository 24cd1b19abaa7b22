//! Scan-based search index over in-process task entries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::ports::{SearchIndex, SearchIndexError};
use crate::domain::{Task, TaskFilter, TaskId, UserId};

#[derive(Debug)]
struct IndexEntry {
    task: Task,
    // Assigned at first insert and kept across re-indexing, so ties on
    // `updated_at` resolve by insertion order.
    sequence: u64,
}

/// In-process [`SearchIndex`].
#[derive(Debug, Default)]
pub struct MemorySearchIndex {
    entries: RwLock<HashMap<TaskId, IndexEntry>>,
    sequence: AtomicU64,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the index contents with an authoritative snapshot of tasks,
    /// in the order given. The explicit recovery procedure for rebuilding
    /// index state from the document store after a partial write.
    pub async fn rebuild(&self, tasks: &[Task]) {
        let mut entries = self.entries.write().await;
        entries.clear();
        for task in tasks {
            let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
            entries.insert(
                task.id,
                IndexEntry {
                    task: task.clone(),
                    sequence,
                },
            );
        }
    }

    fn matches(task: &Task, filter: &TaskFilter) -> bool {
        if let Some(category) = &filter.category {
            if task.category != *category {
                return false;
            }
        }
        if let Some(status) = filter.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(free_text) = &filter.free_text {
            let needle = free_text.to_lowercase();
            let matched = task.title.to_lowercase().contains(&needle)
                || task.description.to_lowercase().contains(&needle);
            if !matched {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn ensure(&self) -> Result<(), SearchIndexError> {
        // No schema to create; trivially idempotent.
        Ok(())
    }

    async fn index(&self, task: &Task) -> Result<(), SearchIndexError> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(&task.id) {
            Some(entry) => entry.task = task.clone(),
            None => {
                let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
                entries.insert(
                    task.id,
                    IndexEntry {
                        task: task.clone(),
                        sequence,
                    },
                );
            }
        }
        Ok(())
    }

    async fn remove(&self, id: &TaskId) -> Result<(), SearchIndexError> {
        self.entries.write().await.remove(id);
        Ok(())
    }

    async fn query(
        &self,
        owner: &UserId,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, SearchIndexError> {
        let entries = self.entries.read().await;
        let mut rows: Vec<&IndexEntry> = entries
            .values()
            .filter(|entry| entry.task.user_id == *owner && Self::matches(&entry.task, filter))
            .collect();
        rows.sort_by(|a, b| {
            b.task
                .updated_at
                .cmp(&a.task.updated_at)
                .then(a.sequence.cmp(&b.sequence))
        });
        Ok(rows.into_iter().map(|entry| entry.task.clone()).collect())
    }
}
