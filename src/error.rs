//! Error types.
//!
//! [`Error`] covers infrastructure and setup failures: binding a port,
//! accepting a connection, compiling a schema. Everything that goes wrong
//! while serving a single request is a [`Failure`](crate::Failure) instead,
//! and ends up on the wire as an [`ApiError`](crate::ApiError).

use std::net::AddrParseError;

/// A boxed, thread-safe error. The catch-all for handler errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by jsonfn's fallible setup operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address: {0}")]
    Addr(#[from] AddrParseError),

    #[error("invalid json schema: {0}")]
    Schema(String),
}

/// Why an argument could not be produced for a handler parameter.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No resolver in the chain knows how to build this parameter.
    #[error("argument #{pos} ({ty}) is not supported by any resolver")]
    Unsupported { pos: usize, ty: &'static str },

    /// A resolver recognised the parameter but could not build a value.
    #[error("argument #{pos} ({ty}) could not be resolved: {reason}")]
    Resolution {
        pos: usize,
        ty: &'static str,
        reason: String,
    },

    /// The parameter needs a request body and there is none.
    #[error("request body is empty")]
    EmptyBody,
}

impl ResolveError {
    pub fn resolution(pos: usize, ty: &'static str, reason: impl Into<String>) -> Self {
        Self::Resolution { pos, ty, reason: reason.into() }
    }
}

/// A validator could not run to completion.
///
/// Distinct from validation findings: findings mean the request is invalid,
/// this means the validator itself failed.
#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    #[error("request body is empty")]
    EmptyBody,

    #[error("unexpected error while validating the request: {0}")]
    Unexpected(#[source] BoxError),
}
