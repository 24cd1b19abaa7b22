//! Bearer credential extraction and the request guard.

use std::sync::Arc;

use actix_web::HttpRequest;
use actix_web::http::header;

use crate::domain::ports::AuthVerifier;
use crate::domain::{ApiResult, Error, User};

/// Pull the bearer credential off the `Authorization` header. A bare header
/// value without the `Bearer ` prefix is accepted as the credential itself.
pub fn extract_bearer(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value);
    (!token.is_empty()).then(|| token.to_owned())
}

/// Resolve the request's credential or fail with Unauthorized. Used ahead of
/// every task route, mirroring the socket handshake's verification path.
pub async fn require_user(
    req: &HttpRequest,
    verifier: &Arc<dyn AuthVerifier>,
) -> ApiResult<User> {
    let token = extract_bearer(req);
    verifier
        .verify(token.as_deref())
        .await
        .ok_or_else(|| Error::unauthorized("Invalid or missing bearer token"))
}
