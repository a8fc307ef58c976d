//! The failure taxonomy.
//!
//! Anything that can go wrong while serving one request is a [`Failure`].
//! The [`ErrorCaster`](crate::ErrorCaster) turns every `Failure` into an
//! [`ApiError`], and only `ApiError`s are ever written to the wire:
//!
//! ```json
//! {"status":400,"kind":"Invalid Request","details":"...","errors":[...],"meta":{...}}
//! ```
//!
//! `errors` and `meta` are omitted when empty.

use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{BoxError, ResolveError, ValidateError};
use crate::validator::Finding;

/// The payload of a caught panic.
pub type PanicPayload = Box<dyn Any + Send + 'static>;

// ── ErrorKind ─────────────────────────────────────────────────────────────────

/// The outward category label of an [`ApiError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "Unknown")]
    Unknown,
    #[serde(rename = "Domain Error")]
    Domain,
    #[serde(rename = "Handler Error")]
    Handler,
    #[serde(rename = "Invalid Request")]
    InvalidRequest,
    #[serde(rename = "Not Found")]
    NotFound,
    #[serde(rename = "Method Not Allowed")]
    MethodNotAllowed,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown          => "Unknown",
            Self::Domain           => "Domain Error",
            Self::Handler          => "Handler Error",
            Self::InvalidRequest   => "Invalid Request",
            Self::NotFound         => "Not Found",
            Self::MethodNotAllowed => "Method Not Allowed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── ApiError ──────────────────────────────────────────────────────────────────

/// The canonical, user-safe error shape.
///
/// The internal cause is kept for the [`ErrorLogger`](crate::ErrorLogger)
/// and never serialized.
#[derive(Clone, Debug, Serialize)]
pub struct ApiError {
    #[serde(serialize_with = "serialize_status")]
    status: StatusCode,
    kind: ErrorKind,
    details: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<Finding>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    meta: Map<String, Value>,
    #[serde(skip)]
    cause: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
}

fn serialize_status<S: Serializer>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u16(status.as_u16())
}

impl ApiError {
    pub fn new(status: StatusCode, kind: ErrorKind, details: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            details: details.into(),
            errors: Vec::new(),
            meta: Map::new(),
            cause: None,
        }
    }

    pub fn with_errors(mut self, errors: Vec<Finding>) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(Arc::from(cause.into()));
        self
    }

    /// Replaces the status with `status` when it is a 4xx or 5xx code.
    pub fn with_reported_status(mut self, status: Option<StatusCode>) -> Self {
        if let Some(status) = status.filter(|s| s.is_client_error() || s.is_server_error()) {
            self.status = status;
        }
        self
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn kind(&self) -> ErrorKind { self.kind }
    pub fn details(&self) -> &str { &self.details }
    pub fn errors(&self) -> &[Finding] { &self.errors }
    pub fn meta(&self) -> &Map<String, Value> { &self.meta }

    /// The internal cause, for logging only.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

/// Equality over the serialized fields. The cause is not compared.
impl PartialEq for ApiError {
    fn eq(&self, other: &Self) -> bool {
        self.status == other.status
            && self.kind == other.kind
            && self.details == other.details
            && self.errors == other.errors
            && self.meta == other.meta
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.details)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn std::error::Error + 'static))
    }
}

impl ReportStatus for ApiError {
    fn report_status(&self) -> StatusCode { self.status }
}

// ── ReportStatus ──────────────────────────────────────────────────────────────

/// Implemented by errors that know which HTTP status they map to.
///
/// The status is only read through [`Failure::reported`], usually from a
/// `From<E> for Failure` impl. Boxing the error into a [`BoxError`] first
/// (`?` on a `Result<_, BoxError>`, or `.into()` on the box) drops it, and
/// the failure is cast to `500 Unknown`.
pub trait ReportStatus {
    fn report_status(&self) -> StatusCode;
}

// ── DomainError ───────────────────────────────────────────────────────────────

/// An expected, user-facing failure of the business logic.
///
/// Cast to `400 Domain Error` with the message as details. The message is
/// shown to the caller, so keep internals out of it and put them in the
/// source instead.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct DomainError {
    message: String,
    status: Option<StatusCode>,
    #[source]
    source: Option<BoxError>,
}

impl DomainError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), status: None, source: None }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn message(&self) -> &str { &self.message }
    pub fn status(&self) -> Option<StatusCode> { self.status }
}

/// A panic caught while invoking a handler, as an error value.
#[derive(Debug, thiserror::Error)]
#[error("handler panicked: {0}")]
pub struct PanicError(pub String);

// ── Failure ───────────────────────────────────────────────────────────────────

/// Everything that can go wrong while serving a request.
#[derive(Debug)]
pub enum Failure {
    /// Already normalized; casting passes it through unchanged.
    Api(ApiError),
    /// A handler panicked with this payload.
    Panic(PanicPayload),
    Domain(DomainError),
    /// Argument resolution failed.
    Resolve(ResolveError),
    /// A body was required and none was sent.
    EmptyBody,
    /// Something went wrong that no caller could have prevented.
    Unexpected(BoxError),
    /// The request failed validation.
    Findings(Vec<Finding>),
    /// Any other error, optionally with a status it reported.
    Error {
        source: BoxError,
        status: Option<StatusCode>,
    },
}

impl Failure {
    pub fn unexpected(err: impl Into<BoxError>) -> Self {
        Self::Unexpected(err.into())
    }

    /// An error that carries its own status code.
    pub fn reported<E>(err: E) -> Self
    where
        E: std::error::Error + ReportStatus + Send + Sync + 'static,
    {
        let status = err.report_status();
        Self::Error { source: Box::new(err), status: Some(status) }
    }
}

impl From<ApiError> for Failure {
    fn from(e: ApiError) -> Self { Self::Api(e) }
}

impl From<DomainError> for Failure {
    fn from(e: DomainError) -> Self { Self::Domain(e) }
}

impl From<ResolveError> for Failure {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::EmptyBody => Self::EmptyBody,
            e => Self::Resolve(e),
        }
    }
}

impl From<ValidateError> for Failure {
    fn from(e: ValidateError) -> Self {
        match e {
            ValidateError::EmptyBody => Self::EmptyBody,
            ValidateError::Unexpected(source) => Self::Unexpected(source),
        }
    }
}

impl From<Vec<Finding>> for Failure {
    fn from(findings: Vec<Finding>) -> Self { Self::Findings(findings) }
}

impl From<BoxError> for Failure {
    fn from(source: BoxError) -> Self { Self::Error { source, status: None } }
}

impl From<std::io::Error> for Failure {
    fn from(e: std::io::Error) -> Self { Self::Error { source: Box::new(e), status: None } }
}

impl From<serde_json::Error> for Failure {
    fn from(e: serde_json::Error) -> Self { Self::Error { source: Box::new(e), status: None } }
}

impl From<String> for Failure {
    fn from(msg: String) -> Self { Self::Error { source: msg.into(), status: None } }
}

impl From<&str> for Failure {
    fn from(msg: &str) -> Self { Self::Error { source: msg.into(), status: None } }
}

impl From<Infallible> for Failure {
    fn from(e: Infallible) -> Self { match e {} }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_in_wire_order_and_omits_empty_fields() {
        let err = ApiError::new(StatusCode::BAD_REQUEST, ErrorKind::InvalidRequest, "bad")
            .with_cause(std::io::Error::other("hidden"));
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#"{"status":400,"kind":"Invalid Request","details":"bad"}"#
        );

        let err = ApiError::new(StatusCode::NOT_FOUND, ErrorKind::NotFound, "gone")
            .with_errors(vec![Finding::new("name", Value::Null, "required")])
            .with_meta("path", "/x");
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#"{"status":404,"kind":"Not Found","details":"gone","errors":[{"field":"name","value":null,"msg":"required"}],"meta":{"path":"/x"}}"#
        );
    }

    #[test]
    fn reported_status_must_be_an_error_status() {
        let err = ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Unknown, "x");
        assert_eq!(err.clone().with_reported_status(Some(StatusCode::OK)).status(), 500);
        assert_eq!(err.clone().with_reported_status(None).status(), 500);
        assert_eq!(err.with_reported_status(Some(StatusCode::CONFLICT)).status(), 409);
    }

    #[test]
    fn empty_body_conversions_collapse() {
        assert!(matches!(Failure::from(ResolveError::EmptyBody), Failure::EmptyBody));
        assert!(matches!(Failure::from(ValidateError::EmptyBody), Failure::EmptyBody));
        assert!(matches!(
            Failure::from(ResolveError::Unsupported { pos: 0, ty: "u8" }),
            Failure::Resolve(_)
        ));
    }
}
