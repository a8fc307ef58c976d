//! Error logging, kept apart from serialization.

use tracing::{error, warn};

use crate::failure::ApiError;
use crate::request::Request;

/// Records a normalized error before it is sent.
///
/// The handler calls this once for every failed request, and never for a
/// successful one. What gets written is up to the implementation.
pub trait ErrorLogger: Send + Sync {
    fn log_error(&self, req: &Request, err: &ApiError);
}

/// Logs through `tracing`, and only errors that kept an internal cause.
///
/// Client mistakes (empty bodies, validation findings, domain errors unless
/// opted in) carry no cause and stay quiet.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl ErrorLogger for TracingLogger {
    fn log_error(&self, req: &Request, err: &ApiError) {
        let Some(cause) = err.cause() else { return };

        if err.status().is_server_error() {
            error!(
                method = %req.method(),
                path = req.path(),
                status = err.status().as_u16(),
                kind = %err.kind(),
                "{cause}"
            );
        } else {
            warn!(
                method = %req.method(),
                path = req.path(),
                status = err.status().as_u16(),
                kind = %err.kind(),
                "{cause}"
            );
        }
    }
}
