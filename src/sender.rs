//! Writing outcomes to the response.

use http::StatusCode;

use crate::failure::ApiError;
use crate::request::Request;
use crate::response::{Response, error_response};
use crate::signature::Payload;

/// What the handler hands to its [`ResponseSender`].
#[derive(Debug)]
pub enum Output {
    /// The function succeeded without a value.
    NoContent,
    /// The function succeeded with a value.
    Value(Payload),
    /// Something failed; already cast and logged.
    Error(ApiError),
}

/// Serializes an [`Output`] into the one response sent for a request.
pub trait ResponseSender: Send + Sync {
    fn send(&self, req: &Request, out: Output) -> Response;
}

/// Sends every output as JSON.
///
/// - no content: `204` with an empty body
/// - a value: its reported status, or `200`, with `Content-Type: application/json`
/// - an error: the error's status and its canonical body
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSender;

impl ResponseSender for JsonSender {
    fn send(&self, _req: &Request, out: Output) -> Response {
        match out {
            Output::NoContent => Response::status(StatusCode::NO_CONTENT),
            Output::Value(payload) => match serde_json::to_vec(&payload.body) {
                Ok(body) => Response::builder()
                    .status(payload.status.unwrap_or(StatusCode::OK))
                    .json(body),
                Err(e) => {
                    tracing::error!(error = %e, "could not serialize response body");
                    error_response(&ApiError::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        crate::ErrorKind::Unknown,
                        crate::caster::UNKNOWN_DETAILS,
                    ))
                }
            },
            Output::Error(err) => error_response(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use http::Method;
    use serde_json::json;

    use super::*;
    use crate::failure::ErrorKind;

    fn send(out: Output) -> Response {
        JsonSender.send(&Request::new(Method::GET, "/"), out)
    }

    #[test]
    fn no_content_is_204_with_empty_body() {
        let res = send(Output::NoContent);
        assert_eq!(res.code(), StatusCode::NO_CONTENT);
        assert!(res.body().is_empty());
    }

    #[test]
    fn values_default_to_200() {
        let res = send(Output::Value(Payload { status: None, body: json!({"msg": "success"}) }));
        assert_eq!(res.code(), StatusCode::OK);
        assert_eq!(res.header("content-type"), Some("application/json"));
        assert_eq!(res.body().as_ref(), br#"{"msg":"success"}"#);

        let res = send(Output::Value(Payload { status: Some(StatusCode::CREATED), body: json!(1) }));
        assert_eq!(res.code(), StatusCode::CREATED);
    }

    #[test]
    fn errors_use_their_own_status() {
        let err = ApiError::new(StatusCode::CONFLICT, ErrorKind::Domain, "taken");
        let res = send(Output::Error(err));
        assert_eq!(res.code(), StatusCode::CONFLICT);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body, json!({"status": 409, "kind": "Domain Error", "details": "taken"}));
    }
}
