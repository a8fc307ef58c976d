//! Casting failures into the canonical [`ApiError`].
//!
//! | Failure | Status | Kind | Details |
//! |---|---|---|---|
//! | `Api` | unchanged | unchanged | unchanged |
//! | `Panic` | 500 | Unknown | `Request failed with unknown error` |
//! | `Domain` | 400 | Domain Error | the domain message |
//! | `Resolve` | 500 | Handler Error | `Could not resolve handler arguments` |
//! | `Unexpected` | 500 | Handler Error | `Unexpected error while handling the request` |
//! | `EmptyBody` | 400 | Invalid Request | `Request body cannot be empty` |
//! | `Findings` | 400 | Invalid Request | `Request body validation has failed` |
//! | `Error` | 500 | Unknown | `Request failed with unknown error` |
//!
//! A status reported by the failure replaces the one in the table when it is
//! a 4xx or 5xx code.

use http::StatusCode;

use crate::failure::{ApiError, ErrorKind, Failure, PanicError, PanicPayload};

pub(crate) const UNKNOWN_DETAILS: &str = "Request failed with unknown error";
const UNRESOLVED_DETAILS: &str = "Could not resolve handler arguments";
const UNEXPECTED_DETAILS: &str = "Unexpected error while handling the request";
const EMPTY_BODY_DETAILS: &str = "Request body cannot be empty";
const FINDINGS_DETAILS: &str = "Request body validation has failed";

/// Turns any [`Failure`] into an [`ApiError`]. Must never fail or panic.
pub trait ErrorCaster: Send + Sync {
    fn cast(&self, failure: Failure) -> ApiError;
}

/// The default casting rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultCaster {
    /// Keep domain errors as the internal cause, so the logger records them.
    pub log_domain_errors: bool,
}

impl DefaultCaster {
    pub fn new(log_domain_errors: bool) -> Self {
        Self { log_domain_errors }
    }
}

impl ErrorCaster for DefaultCaster {
    fn cast(&self, failure: Failure) -> ApiError {
        match failure {
            Failure::Api(e) => e,
            Failure::Panic(payload) => self.cast_panic(payload),
            Failure::Domain(e) => {
                let status = e.status();
                let mut api = ApiError::new(StatusCode::BAD_REQUEST, ErrorKind::Domain, e.message());
                if self.log_domain_errors {
                    api = api.with_cause(e);
                }
                api.with_reported_status(status)
            }
            Failure::Resolve(e) => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Handler, UNRESOLVED_DETAILS)
                    .with_cause(e)
            }
            Failure::Unexpected(e) => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Handler, UNEXPECTED_DETAILS)
                    .with_cause(e)
            }
            Failure::EmptyBody => {
                ApiError::new(StatusCode::BAD_REQUEST, ErrorKind::InvalidRequest, EMPTY_BODY_DETAILS)
            }
            Failure::Findings(findings) => {
                ApiError::new(StatusCode::BAD_REQUEST, ErrorKind::InvalidRequest, FINDINGS_DETAILS)
                    .with_errors(findings)
            }
            Failure::Error { source, status } => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Unknown, UNKNOWN_DETAILS)
                    .with_cause(source)
                    .with_reported_status(status)
            }
        }
    }
}

impl DefaultCaster {
    fn cast_panic(&self, payload: PanicPayload) -> ApiError {
        let payload = match payload.downcast::<ApiError>() {
            Ok(api) => return *api,
            Err(payload) => payload,
        };
        let payload = match payload.downcast::<crate::DomainError>() {
            Ok(domain) => return self.cast(Failure::Domain(*domain)),
            Err(payload) => payload,
        };

        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_owned()
        };

        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Unknown, UNKNOWN_DETAILS)
            .with_cause(PanicError(message))
    }
}
