//! Port abstraction for the cross-instance publish/subscribe fanout bus.

use async_trait::async_trait;
use tokio::sync::broadcast;

/// Errors surfaced by update bus adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateBusError {
    /// Bus backend is unavailable.
    #[error("update bus connection failed: {message}")]
    Connection { message: String },
    /// Publish was rejected by the backend.
    #[error("update bus publish failed: {message}")]
    Publish { message: String },
}

impl UpdateBusError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn publish(message: impl Into<String>) -> Self {
        Self::Publish {
            message: message.into(),
        }
    }
}

/// Fire-and-forget notification channel between service instances.
///
/// Delivery is at-most-once with no durable backlog: a subscriber that is
/// not connected at publish time never sees that event. Every subscriber
/// receives every event published on a topic while it is subscribed; a slow
/// consumer may lag and drop events. Do not conflate this with the durable
/// change log, which exists precisely to allow recovery when the bus drops.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpdateBus: Send + Sync {
    /// Publish `payload` to every current subscriber of `topic`.
    async fn publish(&self, topic: &str, payload: String) -> Result<(), UpdateBusError>;

    /// Subscribe to `topic`, receiving payloads published from now on.
    async fn subscribe(&self, topic: &str)
    -> Result<broadcast::Receiver<String>, UpdateBusError>;
}
