//! Redis-backed adapters for multi-instance deployments.
//!
//! Documents live as RedisJSON values under kind-prefixed keys, the search
//! index is a RediSearch index tracking the `task:` keyspace, the change log
//! is a stream, and the update bus rides Redis pub/sub. All command traffic
//! shares one `bb8` connection pool; the bus additionally holds a dedicated
//! client for its subscriber connections, which cannot be multiplexed.

use bb8_redis::{RedisConnectionManager, bb8, redis};

mod bus;
mod index;
mod recorder;
mod store;

pub use bus::RedisUpdateBus;
pub use index::RedisSearchIndex;
pub use recorder::RedisChangeRecorder;
pub use store::RedisDocumentStore;

/// Shared connection pool used by every Redis adapter.
pub type RedisPool = bb8::Pool<RedisConnectionManager>;

/// Build a connection pool for `url`.
pub async fn connect(url: &str) -> Result<RedisPool, redis::RedisError> {
    let manager = RedisConnectionManager::new(url)?;
    bb8::Pool::builder().build(manager).await
}
