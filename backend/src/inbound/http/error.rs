//! HTTP adapter mapping for domain errors.
//!
//! Keeps the domain error type HTTP-agnostic while letting Actix handlers
//! turn domain failures into consistent JSON responses and status codes.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use tracing::error;

use crate::domain::{Error, ErrorCode};

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn redact_if_internal(failure: &Error) -> Error {
    if matches!(failure.code(), ErrorCode::InternalError) {
        Error::internal("Internal server error")
    } else {
        failure.clone()
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        if matches!(self.code(), ErrorCode::InternalError) {
            error!(message = self.message(), "internal error reached the http boundary");
        }
        HttpResponse::build(self.status_code()).json(redact_if_internal(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorCode::InvalidRequest, StatusCode::BAD_REQUEST)]
    #[case(ErrorCode::Unauthorized, StatusCode::UNAUTHORIZED)]
    #[case(ErrorCode::NotFound, StatusCode::NOT_FOUND)]
    #[case(ErrorCode::Conflict, StatusCode::CONFLICT)]
    #[case(ErrorCode::ServiceUnavailable, StatusCode::SERVICE_UNAVAILABLE)]
    #[case(ErrorCode::InternalError, StatusCode::INTERNAL_SERVER_ERROR)]
    fn maps_codes_to_statuses(#[case] code: ErrorCode, #[case] expected: StatusCode) {
        assert_eq!(Error::new(code, "boom").status_code(), expected);
    }

    #[test]
    fn internal_details_never_reach_the_client() {
        let redacted = redact_if_internal(&Error::internal("pool exhausted at 10.0.0.3"));
        assert_eq!(redacted.message(), "Internal server error");

        let passthrough = redact_if_internal(&Error::not_found("Task not found"));
        assert_eq!(passthrough.message(), "Task not found");
    }
}
