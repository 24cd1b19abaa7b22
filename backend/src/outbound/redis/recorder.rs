//! Stream-backed change log.

use async_trait::async_trait;
use bb8_redis::redis;

use crate::domain::ports::{ChangeRecorder, ChangeRecorderError, LogPosition};
use crate::domain::{ChangeEvent, TASK_CHANGES_STREAM};

use super::RedisPool;

/// [`ChangeRecorder`] appending to a Redis stream. The server-assigned
/// stream id becomes the log position.
#[derive(Clone)]
pub struct RedisChangeRecorder {
    pool: RedisPool,
}

impl RedisChangeRecorder {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChangeRecorder for RedisChangeRecorder {
    async fn append(&self, event: &ChangeEvent) -> Result<LogPosition, ChangeRecorderError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| ChangeRecorderError::connection(error.to_string()))?;

        let id: String = redis::cmd("XADD")
            .arg(TASK_CHANGES_STREAM)
            .arg("*")
            .arg("action")
            .arg(event.action.to_string())
            .arg("taskId")
            .arg(event.task_id.to_string())
            .arg("userId")
            .arg(event.user_id.to_string())
            .arg("category")
            .arg(&event.category)
            .arg("status")
            .arg(event.status.to_string())
            .arg("title")
            .arg(&event.title)
            .query_async(&mut *conn)
            .await
            .map_err(|error| ChangeRecorderError::append(error.to_string()))?;

        Ok(LogPosition::new(id))
    }
}
