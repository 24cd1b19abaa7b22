//! RedisJSON document store.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::redis;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use crate::domain::ports::{DocumentKey, DocumentStore, DocumentStoreError};

use super::RedisPool;

/// Spread retention-aligned expiries so documents created in one burst do
/// not all evict in the same wave. Short TTLs pass through untouched; the
/// jitter only ever shortens, keeping the "inaccessible after expiry"
/// guarantee intact.
fn jittered_ttl_seconds(ttl: Duration) -> u64 {
    let total = ttl.as_secs().max(1);
    if total < 600 {
        return total;
    }
    let spread = total / 20;
    let mut rng = SmallRng::from_entropy();
    total - rng.gen_range(0..spread)
}

/// [`DocumentStore`] backed by RedisJSON with store-enforced TTL.
#[derive(Clone)]
pub struct RedisDocumentStore {
    pool: RedisPool,
}

impl RedisDocumentStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for RedisDocumentStore {
    async fn put(
        &self,
        key: &DocumentKey,
        document: &Value,
        ttl: Option<Duration>,
    ) -> Result<(), DocumentStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| DocumentStoreError::connection(error.to_string()))?;

        let _: () = redis::cmd("JSON.SET")
            .arg(key.as_str())
            .arg("$")
            .arg(document.to_string())
            .query_async(&mut *conn)
            .await
            .map_err(|error| DocumentStoreError::backend(error.to_string()))?;

        if let Some(ttl) = ttl {
            let _: i64 = redis::cmd("EXPIRE")
                .arg(key.as_str())
                .arg(jittered_ttl_seconds(ttl))
                .query_async(&mut *conn)
                .await
                .map_err(|error| DocumentStoreError::backend(error.to_string()))?;
        }
        Ok(())
    }

    async fn get(&self, key: &DocumentKey) -> Result<Option<Value>, DocumentStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| DocumentStoreError::connection(error.to_string()))?;

        let raw: Option<String> = redis::cmd("JSON.GET")
            .arg(key.as_str())
            .query_async(&mut *conn)
            .await
            .map_err(|error| DocumentStoreError::backend(error.to_string()))?;

        match raw {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|error| DocumentStoreError::backend(error.to_string())),
        }
    }

    async fn delete(&self, key: &DocumentKey) -> Result<bool, DocumentStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| DocumentStoreError::connection(error.to_string()))?;

        let removed: i64 = redis::cmd("DEL")
            .arg(key.as_str())
            .query_async(&mut *conn)
            .await
            .map_err(|error| DocumentStoreError::backend(error.to_string()))?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_ttls_are_not_jittered() {
        let ttl = Duration::from_secs(30);
        assert_eq!(jittered_ttl_seconds(ttl), 30);
    }

    #[test]
    fn long_ttls_shrink_by_at_most_five_percent() {
        let total = 60 * 60 * 24 * 30;
        for _ in 0..100 {
            let jittered = jittered_ttl_seconds(Duration::from_secs(total));
            assert!(jittered <= total);
            assert!(jittered > total - total / 20);
        }
    }

    #[test]
    fn zero_ttls_still_expire_promptly() {
        assert_eq!(jittered_ttl_seconds(Duration::from_secs(0)), 1);
    }
}
