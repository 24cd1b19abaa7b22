//! Shared WebSocket adapter state.
//!
//! The entry point depends on the verifier port and the registry, never on
//! concrete services, so the adapter stays testable with deterministic
//! doubles.

use std::sync::Arc;

use url::Url;

use crate::domain::ports::AuthVerifier;
use crate::inbound::ws::WsSink;
use crate::inbound::ws::registry::SessionRegistry;

/// Dependency bundle for the WebSocket entry point.
#[derive(Clone)]
pub struct WsState {
    pub verifier: Arc<dyn AuthVerifier>,
    pub registry: Arc<SessionRegistry<WsSink>>,
    pub allowed_origins: Arc<Vec<Url>>,
}

impl WsState {
    /// Construct state from explicit port implementations.
    pub fn new(
        verifier: Arc<dyn AuthVerifier>,
        registry: Arc<SessionRegistry<WsSink>>,
        allowed_origins: Vec<Url>,
    ) -> Self {
        Self {
            verifier,
            registry,
            allowed_origins: Arc::new(allowed_origins),
        }
    }
}
