//! Pub/sub update bus with a reconnecting subscriber task per topic.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::redis;
use futures_util::StreamExt;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{RwLock, broadcast};
use tracing::warn;

use crate::domain::ports::{UpdateBus, UpdateBusError};

use super::RedisPool;

const CHANNEL_CAPACITY: usize = 256;

fn reconnect_backoff() -> Duration {
    // Jitter keeps a fleet of instances from reconnecting in lock-step.
    let mut rng = SmallRng::from_entropy();
    Duration::from_millis(1000 + rng.gen_range(0..500))
}

/// [`UpdateBus`] riding Redis pub/sub.
///
/// Publishes go through the shared pool. Each locally subscribed topic gets
/// one dedicated subscriber connection feeding a broadcast channel; the
/// relay lives for the process lifetime and reconnects with jittered
/// backoff. Messages published while the relay is disconnected are lost,
/// which is the bus's documented at-most-once contract — the durable change
/// log exists for recovery.
pub struct RedisUpdateBus {
    pool: RedisPool,
    client: redis::Client,
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
}

impl RedisUpdateBus {
    /// Create a bus publishing through `pool` and subscribing via a
    /// dedicated client for `url`.
    pub fn new(url: &str, pool: RedisPool) -> Result<Self, redis::RedisError> {
        Ok(Self {
            pool,
            client: redis::Client::open(url)?,
            channels: RwLock::new(HashMap::new()),
        })
    }
}

async fn relay(client: redis::Client, topic: String, sender: broadcast::Sender<String>) {
    loop {
        match client.get_async_pubsub().await {
            Ok(mut pubsub) => {
                if let Err(error) = pubsub.subscribe(&topic).await {
                    warn!(error = %error, topic = %topic, "update bus subscribe failed");
                } else {
                    let mut messages = pubsub.on_message();
                    while let Some(message) = messages.next().await {
                        match message.get_payload::<String>() {
                            Ok(payload) => {
                                // Send errors only mean nobody is listening right now.
                                let _ = sender.send(payload);
                            }
                            Err(error) => {
                                warn!(error = %error, topic = %topic, "dropping undecodable bus payload");
                            }
                        }
                    }
                    warn!(topic = %topic, "update bus subscription ended; reconnecting");
                }
            }
            Err(error) => {
                warn!(error = %error, topic = %topic, "update bus connection failed");
            }
        }

        tokio::time::sleep(reconnect_backoff()).await;
    }
}

#[async_trait]
impl UpdateBus for RedisUpdateBus {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), UpdateBusError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| UpdateBusError::connection(error.to_string()))?;

        let _receivers: i64 = redis::cmd("PUBLISH")
            .arg(topic)
            .arg(payload)
            .query_async(&mut *conn)
            .await
            .map_err(|error| UpdateBusError::publish(error.to_string()))?;
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
    ) -> Result<broadcast::Receiver<String>, UpdateBusError> {
        let mut channels = self.channels.write().await;
        if let Some(sender) = channels.get(topic) {
            return Ok(sender.subscribe());
        }

        let (sender, receiver) = broadcast::channel(CHANNEL_CAPACITY);
        channels.insert(topic.to_owned(), sender.clone());
        tokio::spawn(relay(self.client.clone(), topic.to_owned(), sender));
        Ok(receiver)
    }
}
