//! Shared HTTP adapter state.
//!
//! Handlers accept this via `actix_web::web::Data` so they depend only on
//! domain ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{AuthVerifier, TasksCommand, TasksQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub commands: Arc<dyn TasksCommand>,
    pub queries: Arc<dyn TasksQuery>,
    pub verifier: Arc<dyn AuthVerifier>,
}

impl HttpState {
    /// Construct state from explicit port implementations.
    pub fn new(
        commands: Arc<dyn TasksCommand>,
        queries: Arc<dyn TasksQuery>,
        verifier: Arc<dyn AuthVerifier>,
    ) -> Self {
        Self {
            commands,
            queries,
            verifier,
        }
    }
}
