//! WebSocket inbound adapter: the live half of task synchronization.
//!
//! Responsibilities:
//! - validate upgrade requests (origin allow-list)
//! - extract the bearer credential (explicit `token` query field wins over
//!   an `Authorization` header)
//! - hand the connection to the per-session handler and registry

use std::collections::HashMap;

use actix_web::http::header::{HeaderValue, ORIGIN};
use actix_web::{HttpRequest, HttpResponse, error, get, rt, web};
use tracing::warn;
use url::Url;

use crate::inbound::http::auth::extract_bearer;

pub mod messages;
pub mod registry;
mod session;
pub mod state;

pub use session::WsSink;
pub use state::WsState;

/// Handle WebSocket upgrade for the `/ws` endpoint.
#[get("/ws")]
pub async fn ws_entry(
    state: web::Data<WsState>,
    req: HttpRequest,
    stream: web::Payload,
) -> actix_web::Result<HttpResponse> {
    validate_origin(req.headers().get(ORIGIN), &state.allowed_origins)?;

    let token = extract_token(&req);
    let (response, session, msg_stream) = actix_ws::handle(&req, stream)?;
    rt::spawn(session::handle_ws_session(
        state.verifier.clone(),
        state.registry.clone(),
        session,
        msg_stream,
        token,
    ));
    Ok(response)
}

/// The explicit auth field takes precedence over a header-style credential.
fn extract_token(req: &HttpRequest) -> Option<String> {
    if let Ok(query) = web::Query::<HashMap<String, String>>::from_query(req.query_string()) {
        if let Some(token) = query.get("token") {
            if !token.is_empty() {
                return Some(token.clone());
            }
        }
    }
    extract_bearer(req)
}

/// Reject browser upgrades from outside the configured allow-list. Requests
/// without an `Origin` header (non-browser clients) pass through; the
/// handshake still authenticates them.
fn validate_origin(header: Option<&HeaderValue>, allowed: &[Url]) -> actix_web::Result<()> {
    let Some(header) = header else {
        return Ok(());
    };
    let value = header
        .to_str()
        .map_err(|_| error::ErrorBadRequest("Invalid Origin header"))?;
    let origin =
        Url::parse(value).map_err(|_| error::ErrorBadRequest("Invalid Origin header"))?;

    let permitted = allowed.iter().any(|candidate| {
        candidate.scheme() == origin.scheme()
            && candidate.host_str() == origin.host_str()
            && candidate.port_or_known_default() == origin.port_or_known_default()
    });
    if permitted {
        Ok(())
    } else {
        warn!(origin = value, "rejected websocket upgrade from disallowed origin");
        Err(error::ErrorForbidden("Origin not allowed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test::TestRequest;
    use rstest::rstest;

    fn allow_list() -> Vec<Url> {
        vec![
            Url::parse("http://localhost:3000").expect("static url must parse"),
            Url::parse("https://tasks.example.com").expect("static url must parse"),
        ]
    }

    #[rstest]
    #[case("http://localhost:3000")]
    #[case("https://tasks.example.com")]
    fn accepts_configured_origins(#[case] origin: &str) {
        let header = HeaderValue::from_str(origin).expect("valid header value");
        assert!(validate_origin(Some(&header), &allow_list()).is_ok());
    }

    #[rstest]
    #[case("http://localhost:4000")]
    #[case("https://evil.example.com")]
    #[case("http://tasks.example.com")]
    fn rejects_disallowed_origins(#[case] origin: &str) {
        let header = HeaderValue::from_str(origin).expect("valid header value");
        let rejection =
            validate_origin(Some(&header), &allow_list()).expect_err("origin must be rejected");
        assert_eq!(
            rejection.as_response_error().status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn rejects_unparsable_origins() {
        let header = HeaderValue::from_static("not a url");
        let rejection =
            validate_origin(Some(&header), &allow_list()).expect_err("origin must be rejected");
        assert_eq!(
            rejection.as_response_error().status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn absent_origins_pass_through() {
        assert!(validate_origin(None, &allow_list()).is_ok());
    }

    #[test]
    fn query_token_wins_over_the_authorization_header() {
        let req = TestRequest::get()
            .uri("/ws?token=from-query")
            .insert_header(("Authorization", "Bearer from-header"))
            .to_http_request();
        assert_eq!(extract_token(&req).as_deref(), Some("from-query"));
    }

    #[test]
    fn header_credentials_back_up_an_absent_query_token() {
        let req = TestRequest::get()
            .uri("/ws")
            .insert_header(("Authorization", "Bearer from-header"))
            .to_http_request();
        assert_eq!(extract_token(&req).as_deref(), Some("from-header"));
    }

    #[test]
    fn missing_credentials_yield_none() {
        let req = TestRequest::get().uri("/ws").to_http_request();
        assert_eq!(extract_token(&req), None);
    }
}
