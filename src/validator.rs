//! Request validation, run before any argument is resolved.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidateError;
use crate::request::Request;

/// One field-level problem found in a request.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Finding {
    pub field: String,
    pub value: Value,
    pub msg: String,
}

impl Finding {
    pub fn new(field: impl Into<String>, value: Value, msg: impl Into<String>) -> Self {
        Self { field: field.into(), value, msg: msg.into() }
    }
}

/// Inspects a request before its arguments are resolved.
///
/// Return the findings in the order they should be reported; an empty list
/// means the request is valid. Return `Err` only when validation itself
/// could not run. Bodies are buffered, so reading one here leaves it intact
/// for the resolvers that run afterwards.
pub trait RequestValidator: Send + Sync {
    fn validate(&self, req: &Request) -> Result<Vec<Finding>, ValidateError>;
}

/// Accepts every request. The default.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopValidator;

impl RequestValidator for NoopValidator {
    fn validate(&self, _req: &Request) -> Result<Vec<Finding>, ValidateError> {
        Ok(Vec::new())
    }
}

impl<F> RequestValidator for F
where
    F: Fn(&Request) -> Result<Vec<Finding>, ValidateError> + Send + Sync,
{
    fn validate(&self, req: &Request) -> Result<Vec<Finding>, ValidateError> {
        self(req)
    }
}
