//! Per-instance registry of live WebSocket sessions keyed by user identity.
//!
//! The registry stores only send capabilities, never references into other
//! subsystems. It is this instance's slice of the fleet-wide fanout: the
//! dispatcher consumes the update bus (which spans every instance) and
//! re-emits each event to the locally connected sessions it concerns.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{TaskUpdate, UserId};
use crate::inbound::ws::messages::ServerMessage;

/// The peer is gone; the registry prunes the sink on the next dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("websocket peer is no longer connected")]
pub struct SinkClosed;

/// Capability to push one frame to one connected client.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&mut self, frame: String) -> Result<(), SinkClosed>;
}

/// Concurrent-safe session registry: user identity → live connections.
pub struct SessionRegistry<S> {
    sessions: RwLock<HashMap<UserId, HashMap<Uuid, S>>>,
}

impl<S: EventSink> SessionRegistry<S> {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection under `user`. A user may hold any number of
    /// concurrent connections.
    pub async fn register(&self, user: UserId, connection: Uuid, sink: S) {
        self.sessions
            .write()
            .await
            .entry(user)
            .or_default()
            .insert(connection, sink);
    }

    /// Remove one connection. In-flight mutations issued over it are not
    /// cancelled; only the delivery endpoint disappears.
    pub async fn deregister(&self, user: &UserId, connection: &Uuid) {
        let mut sessions = self.sessions.write().await;
        if let Some(connections) = sessions.get_mut(user) {
            connections.remove(connection);
            if connections.is_empty() {
                sessions.remove(user);
            }
        }
    }

    /// Number of live connections across all users on this instance.
    pub async fn connection_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .map(|connections| connections.len())
            .sum()
    }

    /// Deliver `update` to the sessions it concerns: the owner's sessions
    /// when it carries one, every local session otherwise. Dead sinks are
    /// pruned as they are discovered.
    pub async fn dispatch(&self, update: &TaskUpdate) {
        let message = ServerMessage::TaskUpdate {
            update: update.clone(),
        };
        let Some(frame) = message.to_frame() else {
            return;
        };

        let mut sessions = self.sessions.write().await;
        let mut stale: Vec<(UserId, Uuid)> = Vec::new();
        match update.user_id {
            Some(owner) => {
                if let Some(connections) = sessions.get_mut(&owner) {
                    for (id, sink) in connections.iter_mut() {
                        if sink.send(frame.clone()).await.is_err() {
                            stale.push((owner, *id));
                        }
                    }
                }
            }
            None => {
                for (user, connections) in sessions.iter_mut() {
                    for (id, sink) in connections.iter_mut() {
                        if sink.send(frame.clone()).await.is_err() {
                            stale.push((*user, *id));
                        }
                    }
                }
            }
        }

        for (user, connection) in stale {
            if let Some(connections) = sessions.get_mut(&user) {
                connections.remove(&connection);
                if connections.is_empty() {
                    sessions.remove(&user);
                }
            }
        }
    }
}

impl<S: EventSink> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain `updates` into the registry. Malformed payloads are logged and
/// dropped; lag is logged and skipped; a closed channel ends the loop.
pub async fn pump_updates<S: EventSink>(
    registry: Arc<SessionRegistry<S>>,
    mut updates: broadcast::Receiver<String>,
) {
    loop {
        match updates.recv().await {
            Ok(payload) => match serde_json::from_str::<TaskUpdate>(&payload) {
                Ok(update) => registry.dispatch(&update).await,
                Err(parse_error) => {
                    warn!(error = %parse_error, "dropping malformed task update payload");
                }
            },
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "task update consumer lagged; events were dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::UpdateBus;
    use crate::domain::{ChangeAction, CreateTaskPayload, TASK_UPDATES_TOPIC, Task};
    use crate::outbound::memory::MemoryUpdateBus;
    use chrono::Utc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingSink {
        frames: Arc<Mutex<Vec<String>>>,
        closed: bool,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn send(&mut self, frame: String) -> Result<(), SinkClosed> {
            if self.closed {
                return Err(SinkClosed);
            }
            self.frames.lock().await.push(frame);
            Ok(())
        }
    }

    fn update_for(owner: UserId) -> TaskUpdate {
        let task = Task::create(
            owner,
            CreateTaskPayload {
                title: "Buy milk".to_owned(),
                description: None,
                category: None,
            },
            Utc::now(),
        );
        TaskUpdate::owned(ChangeAction::Created, task)
    }

    #[tokio::test]
    async fn owned_updates_reach_only_the_owners_sessions() {
        let registry = SessionRegistry::new();
        let alice = UserId::random();
        let bob = UserId::random();
        let alice_first = RecordingSink::default();
        let alice_second = RecordingSink::default();
        let bob_sink = RecordingSink::default();
        registry
            .register(alice, Uuid::new_v4(), alice_first.clone())
            .await;
        registry
            .register(alice, Uuid::new_v4(), alice_second.clone())
            .await;
        registry.register(bob, Uuid::new_v4(), bob_sink.clone()).await;

        registry.dispatch(&update_for(alice)).await;

        assert_eq!(alice_first.frames.lock().await.len(), 1);
        assert_eq!(alice_second.frames.lock().await.len(), 1);
        assert!(bob_sink.frames.lock().await.is_empty());
    }

    #[tokio::test]
    async fn ownerless_updates_broadcast_to_every_session() {
        let registry = SessionRegistry::new();
        let alice_sink = RecordingSink::default();
        let bob_sink = RecordingSink::default();
        registry
            .register(UserId::random(), Uuid::new_v4(), alice_sink.clone())
            .await;
        registry
            .register(UserId::random(), Uuid::new_v4(), bob_sink.clone())
            .await;

        let mut update = update_for(UserId::random());
        update.user_id = None;
        registry.dispatch(&update).await;

        assert_eq!(alice_sink.frames.lock().await.len(), 1);
        assert_eq!(bob_sink.frames.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn dead_sinks_are_pruned_on_dispatch() {
        let registry = SessionRegistry::new();
        let user = UserId::random();
        let dead = RecordingSink {
            closed: true,
            ..RecordingSink::default()
        };
        let live = RecordingSink::default();
        registry.register(user, Uuid::new_v4(), dead).await;
        registry.register(user, Uuid::new_v4(), live.clone()).await;
        assert_eq!(registry.connection_count().await, 2);

        registry.dispatch(&update_for(user)).await;

        assert_eq!(registry.connection_count().await, 1);
        assert_eq!(live.frames.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn deregister_removes_exactly_one_connection() {
        let registry: SessionRegistry<RecordingSink> = SessionRegistry::new();
        let user = UserId::random();
        let keep = Uuid::new_v4();
        let discard = Uuid::new_v4();
        registry.register(user, keep, RecordingSink::default()).await;
        registry
            .register(user, discard, RecordingSink::default())
            .await;

        registry.deregister(&user, &discard).await;
        assert_eq!(registry.connection_count().await, 1);
        registry.deregister(&user, &keep).await;
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn bus_events_flow_through_the_dispatcher() {
        let registry = Arc::new(SessionRegistry::new());
        let bus: Arc<dyn UpdateBus> = Arc::new(MemoryUpdateBus::new());
        let user = UserId::random();
        let sink = RecordingSink::default();
        registry.register(user, Uuid::new_v4(), sink.clone()).await;

        let updates = bus
            .subscribe(TASK_UPDATES_TOPIC)
            .await
            .expect("subscribe must succeed");
        let pump = tokio::spawn(pump_updates(registry.clone(), updates));

        // Malformed payloads are dropped without killing the dispatcher.
        bus.publish(TASK_UPDATES_TOPIC, "{not json".to_owned())
            .await
            .expect("publish must succeed");
        let payload =
            serde_json::to_string(&update_for(user)).expect("update must serialise");
        bus.publish(TASK_UPDATES_TOPIC, payload)
            .await
            .expect("publish must succeed");

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if !sink.frames.lock().await.is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("the valid event must be delivered");

        assert_eq!(sink.frames.lock().await.len(), 1);
        pump.abort();
    }
}
