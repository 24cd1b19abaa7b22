//! RediSearch index over task documents.
//!
//! The index tracks the `task:` keyspace directly, so the RedisJSON write is
//! itself the index mutation; `index`/`remove` only exist to satisfy the
//! port's step ordering. Queries always carry the owner tag clause, and a
//! free-text term that sanitises to nothing fails closed to empty results.

use async_trait::async_trait;
use bb8_redis::redis;
use tracing::{debug, warn};

use crate::domain::ports::{SearchIndex, SearchIndexError};
use crate::domain::{Task, TaskFilter, TaskId, UserId};

use super::RedisPool;

const TASK_INDEX: &str = "idx:tasks";
const KEY_PREFIX: &str = "task:";
const RESULT_LIMIT: usize = 200;

/// Escape a value for use inside a RediSearch tag clause. Everything that is
/// not alphanumeric or an underscore gets a backslash.
fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if !(c.is_alphanumeric() || c == '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Reduce a free-text term to plain word tokens. Query-reserved punctuation
/// is dropped entirely rather than escaped, so user input can never alter
/// the query structure.
fn sanitize_free_text(value: &str) -> String {
    let kept: String = value
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' {
                c
            } else {
                ' '
            }
        })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the FT.SEARCH query for `owner` and `filter`. `None` means the
/// filter cannot be expressed safely and the caller must return empty
/// results instead of sending a malformed query.
fn build_query(owner: &UserId, filter: &TaskFilter) -> Option<String> {
    let mut clauses = vec![format!("@userId:{{{}}}", escape_tag(&owner.to_string()))];
    if let Some(category) = &filter.category {
        clauses.push(format!("@category:{{{}}}", escape_tag(category)));
    }
    if let Some(status) = filter.status {
        clauses.push(format!("@status:{{{status}}}"));
    }
    if let Some(raw) = &filter.free_text {
        let term = sanitize_free_text(raw);
        if term.is_empty() {
            return None;
        }
        clauses.push(format!("(@title|@description):({term})"));
    }
    Some(clauses.join(" "))
}

fn as_text(value: &redis::Value) -> Option<String> {
    match value {
        redis::Value::BulkString(bytes) => String::from_utf8(bytes.clone()).ok(),
        redis::Value::SimpleString(text) => Some(text.clone()),
        _ => None,
    }
}

/// Decode an FT.SEARCH reply: `[total, key, [path, json], key, [path, json], …]`.
/// Documents that fail to decode are skipped, never fatal.
fn parse_search_results(value: &redis::Value) -> Vec<Task> {
    let redis::Value::Array(items) = value else {
        return Vec::new();
    };
    let mut tasks = Vec::new();
    let mut entries = items.iter().skip(1);
    while let (Some(_key), Some(fields)) = (entries.next(), entries.next()) {
        let redis::Value::Array(fields) = fields else {
            continue;
        };
        let mut pairs = fields.iter();
        while let (Some(name), Some(payload)) = (pairs.next(), pairs.next()) {
            if as_text(name).as_deref() != Some("$") {
                continue;
            }
            let Some(json) = as_text(payload) else {
                continue;
            };
            match serde_json::from_str::<Task>(&json) {
                Ok(task) => tasks.push(task),
                Err(error) => {
                    warn!(error = %error, "skipping malformed indexed task document");
                }
            }
        }
    }
    tasks
}

/// [`SearchIndex`] backed by a RediSearch index over the `task:` keyspace.
#[derive(Clone)]
pub struct RedisSearchIndex {
    pool: RedisPool,
}

impl RedisSearchIndex {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Drop and recreate the index schema. RediSearch then rescans the
    /// `task:` keyspace — the document store itself — so this is the
    /// explicit recovery procedure when index state is suspect.
    pub async fn recreate(&self) -> Result<(), SearchIndexError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| SearchIndexError::connection(error.to_string()))?;

        let dropped: Result<(), redis::RedisError> = redis::cmd("FT.DROPINDEX")
            .arg(TASK_INDEX)
            .query_async(&mut *conn)
            .await;
        if let Err(error) = dropped {
            // A missing index is exactly the state we are about to fix.
            if !error.to_string().contains("Unknown") {
                return Err(SearchIndexError::query(error.to_string()));
            }
        }
        drop(conn);
        self.ensure().await
    }
}

#[async_trait]
impl SearchIndex for RedisSearchIndex {
    async fn ensure(&self) -> Result<(), SearchIndexError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| SearchIndexError::connection(error.to_string()))?;

        let created: Result<(), redis::RedisError> = redis::cmd("FT.CREATE")
            .arg(TASK_INDEX)
            .arg("ON")
            .arg("JSON")
            .arg("PREFIX")
            .arg(1)
            .arg(KEY_PREFIX)
            .arg("SCHEMA")
            .arg("$.title")
            .arg("AS")
            .arg("title")
            .arg("TEXT")
            .arg("$.description")
            .arg("AS")
            .arg("description")
            .arg("TEXT")
            .arg("$.category")
            .arg("AS")
            .arg("category")
            .arg("TAG")
            .arg("$.status")
            .arg("AS")
            .arg("status")
            .arg("TAG")
            .arg("$.userId")
            .arg("AS")
            .arg("userId")
            .arg("TAG")
            .query_async(&mut *conn)
            .await;

        match created {
            Ok(()) => Ok(()),
            Err(error) if error.to_string().contains("Index already exists") => {
                debug!("task index already exists, skipping");
                Ok(())
            }
            Err(error) => Err(SearchIndexError::query(error.to_string())),
        }
    }

    async fn index(&self, _task: &Task) -> Result<(), SearchIndexError> {
        // RediSearch follows the task: keyspace; the JSON.SET already
        // re-indexed the document.
        Ok(())
    }

    async fn remove(&self, _id: &TaskId) -> Result<(), SearchIndexError> {
        // Keyspace-tracked: the DEL removed the index entry.
        Ok(())
    }

    async fn query(
        &self,
        owner: &UserId,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, SearchIndexError> {
        let Some(query) = build_query(owner, filter) else {
            debug!("free-text filter sanitised to nothing; failing closed");
            return Ok(Vec::new());
        };

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| SearchIndexError::connection(error.to_string()))?;

        let reply: redis::Value = redis::cmd("FT.SEARCH")
            .arg(TASK_INDEX)
            .arg(query)
            .arg("RETURN")
            .arg(1)
            .arg("$")
            .arg("LIMIT")
            .arg(0)
            .arg(RESULT_LIMIT)
            .query_async(&mut *conn)
            .await
            .map_err(|error| SearchIndexError::query(error.to_string()))?;

        let mut tasks = parse_search_results(&reply);
        // Stable sort: ties keep the index's insertion order.
        tasks.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(tasks)
    }
}
