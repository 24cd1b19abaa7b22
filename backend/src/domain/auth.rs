//! Bearer credential verification against embedded claims and store state.
//!
//! A credential is valid only when *both* agree: the JWT signature and
//! expiry claim must check out, and the token must still be present in the
//! document store (its session record carries its own TTL and can be revoked
//! independently of the claim). Issuing credentials is the auth service's
//! job; this crate never signs anything outside its tests.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::ports::{AuthVerifier, DocumentKey, DocumentStore};
use crate::domain::{User, UserId};

/// Claims embedded in the bearer credential by the issuing service.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

/// Store-backed implementation of the [`AuthVerifier`] port.
pub struct TokenVerifier {
    store: Arc<dyn DocumentStore>,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier decoding claims with `secret`.
    pub fn new(store: Arc<dyn DocumentStore>, secret: &str) -> Self {
        Self {
            store,
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    async fn stored_document(&self, key: &DocumentKey) -> Option<serde_json::Value> {
        match self.store.get(key).await {
            Ok(document) => document,
            Err(error) => {
                warn!(error = %error, key = %key, "credential lookup failed");
                None
            }
        }
    }
}

#[async_trait]
impl AuthVerifier for TokenVerifier {
    async fn verify<'a>(&self, token: Option<&'a str>) -> Option<User> {
        let token = token.filter(|value| !value.is_empty())?;

        let data =
            match jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation) {
                Ok(data) => data,
                Err(error) => {
                    debug!(error = %error, "rejected credential with invalid claims");
                    return None;
                }
            };

        let session = self.stored_document(&DocumentKey::for_token(token)).await?;
        let user_id: UserId = session.as_str()?.parse().ok()?;
        if data.claims.sub.parse::<UserId>().ok() != Some(user_id) {
            debug!("credential subject does not match its stored session");
            return None;
        }

        let document = self.stored_document(&DocumentKey::for_user(&user_id)).await?;
        match serde_json::from_value::<User>(document) {
            Ok(user) => Some(user),
            Err(error) => {
                warn!(error = %error, user = %user_id, "stored user document is malformed");
                None
            }
        }
    }
}
