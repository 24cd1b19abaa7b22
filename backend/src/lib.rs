//! Real-time, indexed, multi-instance task synchronization backend.
//!
//! The core of the service is a write pipeline over four infrastructure
//! ports: a key-addressed JSON [`domain::ports::DocumentStore`] with TTL
//! support, a [`domain::ports::SearchIndex`] over task documents, an
//! append-only [`domain::ports::ChangeRecorder`], and a best-effort
//! [`domain::ports::UpdateBus`] fanning mutation events out to every running
//! instance. Each instance's WebSocket session registry subscribes to the
//! bus and forwards events to the owning user's live connections, so a write
//! handled by one replica reaches sockets connected to any other.
//!
//! Adapters come in two flavours: Redis-backed (`outbound::redis`, the
//! production multi-instance deployment) and in-process (`outbound::memory`,
//! single-instance mode and tests). Bearer credentials are *verified* here
//! (claims plus store-side session presence); issuing them is the auth
//! service's job.

pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod server;
