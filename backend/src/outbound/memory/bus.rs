//! Broadcast-channel update bus for single-instance deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use crate::domain::ports::{UpdateBus, UpdateBusError};

const CHANNEL_CAPACITY: usize = 256;

/// In-process [`UpdateBus`] with one broadcast channel per topic.
///
/// A topic's channel is created on first subscribe; publishing to a topic
/// nobody ever subscribed to drops the event, matching the no-backlog
/// contract.
#[derive(Debug, Default)]
pub struct MemoryUpdateBus {
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
}

impl MemoryUpdateBus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UpdateBus for MemoryUpdateBus {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), UpdateBusError> {
        if let Some(sender) = self.channels.read().await.get(topic) {
            // Send errors only mean nobody is currently listening.
            let _ = sender.send(payload);
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
    ) -> Result<broadcast::Receiver<String>, UpdateBusError> {
        let mut channels = self.channels.write().await;
        let sender = channels
            .entry(topic.to_owned())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        Ok(sender.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fans_out_to_every_subscriber() {
        let bus = MemoryUpdateBus::new();
        let mut first = bus.subscribe("updates").await.expect("subscribe");
        let mut second = bus.subscribe("updates").await.expect("subscribe");

        bus.publish("updates", "payload".to_owned())
            .await
            .expect("publish must succeed");

        assert_eq!(first.recv().await.expect("first receives"), "payload");
        assert_eq!(second.recv().await.expect("second receives"), "payload");
    }

    #[tokio::test]
    async fn events_published_before_any_subscription_are_dropped() {
        let bus = MemoryUpdateBus::new();
        bus.publish("updates", "lost".to_owned())
            .await
            .expect("publish must succeed");

        let mut late = bus.subscribe("updates").await.expect("subscribe");
        bus.publish("updates", "seen".to_owned())
            .await
            .expect("publish must succeed");
        assert_eq!(late.recv().await.expect("late receives"), "seen");
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let bus = MemoryUpdateBus::new();
        let mut tasks = bus.subscribe("tasks").await.expect("subscribe");
        let _users = bus.subscribe("users").await.expect("subscribe");

        bus.publish("users", "other".to_owned())
            .await
            .expect("publish must succeed");
        bus.publish("tasks", "mine".to_owned())
            .await
            .expect("publish must succeed");

        assert_eq!(tasks.recv().await.expect("receives own topic"), "mine");
    }
}
