//! Port abstraction for the external credential verifier.

use async_trait::async_trait;

use crate::domain::User;

/// Resolve a bearer credential to its user.
///
/// Used identically by the HTTP guard and the WebSocket handshake. `None`
/// covers every rejection: missing, malformed, expired, or revoked
/// credentials — callers translate it to their boundary's unauthorized
/// signal.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthVerifier: Send + Sync {
    async fn verify<'a>(&self, token: Option<&'a str>) -> Option<User>;
}
