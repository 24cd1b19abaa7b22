//! Port abstraction for the append-only change log.

use std::fmt;

use async_trait::async_trait;

use crate::domain::ChangeEvent;

/// Position assigned to an appended event. Positions are monotonic within a
/// stream and encode the append timestamp, like a Redis stream id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPosition(String);

impl LogPosition {
    pub fn new(position: impl Into<String>) -> Self {
        Self(position.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for LogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by change recorder adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChangeRecorderError {
    /// Log backend is unavailable.
    #[error("change recorder connection failed: {message}")]
    Connection { message: String },
    /// Append was rejected or lost by the backend.
    #[error("change recorder append failed: {message}")]
    Append { message: String },
}

impl ChangeRecorderError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn append(message: impl Into<String>) -> Self {
        Self::Append {
            message: message.into(),
        }
    }
}

/// Append-only ordered log of mutations, independent of the index.
///
/// The change log is best-effort telemetry, not the source of truth: callers
/// must log and suppress recorder failures rather than fail the primary
/// write. No read API is exposed here; reads are an operational concern.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChangeRecorder: Send + Sync {
    /// Append `event`, returning its assigned position.
    async fn append(&self, event: &ChangeEvent) -> Result<LogPosition, ChangeRecorderError>;
}
