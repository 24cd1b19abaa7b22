//! Vector-backed change log.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::domain::ChangeEvent;
use crate::domain::ports::{ChangeRecorder, ChangeRecorderError, LogPosition};

/// In-process [`ChangeRecorder`].
///
/// Positions mimic stream ids (`<millis>-<sequence>`); the sequence
/// component keeps them strictly increasing even within one millisecond.
#[derive(Debug, Default)]
pub struct MemoryChangeRecorder {
    entries: Mutex<Vec<ChangeEvent>>,
}

impl MemoryChangeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far, in order.
    pub async fn recorded(&self) -> Vec<ChangeEvent> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl ChangeRecorder for MemoryChangeRecorder {
    async fn append(&self, event: &ChangeEvent) -> Result<LogPosition, ChangeRecorderError> {
        let mut entries = self.entries.lock().await;
        entries.push(event.clone());
        Ok(LogPosition::new(format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            entries.len()
        )))
    }
}
