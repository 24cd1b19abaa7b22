//! In-process adapters for all four infrastructure ports.
//!
//! These back single-instance deployments (no `REDIS_URL`) and the test
//! suite. Semantics mirror the Redis adapters: best-effort TTL on the store,
//! owner-scoped index queries ordered by `updated_at`, monotonic log
//! positions, and a no-backlog broadcast bus.

mod bus;
mod index;
mod recorder;
mod store;

pub use bus::MemoryUpdateBus;
pub use index::MemorySearchIndex;
pub use recorder::MemoryChangeRecorder;
pub use store::MemoryDocumentStore;
