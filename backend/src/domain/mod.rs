//! Domain entities, ports, and services for the task synchronization engine.
//!
//! Types here are transport agnostic. Inbound adapters map them to HTTP
//! responses or WebSocket frames; outbound adapters persist and distribute
//! them. Invariants and serialisation contracts (serde) are documented on
//! each type.

pub mod auth;
pub mod change;
pub mod error;
pub mod ports;
pub mod task;
pub mod task_service;
pub mod user;

pub use auth::TokenVerifier;
pub use change::{ChangeAction, ChangeEvent, TASK_CHANGES_STREAM, TASK_UPDATES_TOPIC, TaskUpdate};
pub use error::{Error, ErrorCode};
pub use task::{
    CreateTaskPayload, DEFAULT_CATEGORY, Task, TaskFilter, TaskId, TaskStatus, UpdateTaskPayload,
};
pub use task_service::{TASK_RETENTION, TaskSyncService};
pub use user::{User, UserId};

/// Convenient result alias for fallible domain operations.
pub type ApiResult<T> = Result<T, Error>;
