//! Outgoing HTTP response type.
//!
//! Handlers never build a [`Response`] by hand: the [`ResponseSender`]
//! produces one from the function's outcome. The type is public so custom
//! senders can build it and tests can inspect it.
//!
//! [`ResponseSender`]: crate::ResponseSender

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;

use crate::failure::ApiError;

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use http::StatusCode;
/// use jsonfn::Response;
///
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    pub(crate) body: Bytes,
    pub(crate) headers: HeaderMap,
    pub(crate) status: StatusCode,
}

impl Response {
    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { body: Bytes::new(), headers: HeaderMap::new(), status: code }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: HeaderMap::new(), status: StatusCode::OK }
    }

    pub fn code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Converts into the `http` response hyper writes to the wire.
    pub fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`]. Defaults to `200 OK`.
pub struct ResponseBuilder {
    headers: HeaderMap,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(mut self, body: impl Into<Bytes>) -> Response {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Response { body: body.into(), headers: self.headers, status: self.status }
    }
}

/// Serializes `err` into its wire shape.
///
/// Serializing an [`ApiError`] cannot realistically fail; if it somehow does,
/// a fixed 500 body is sent instead so the response is still well-formed.
pub fn error_response(err: &ApiError) -> Response {
    match serde_json::to_vec(err) {
        Ok(body) => Response::builder().status(err.status()).json(body),
        Err(_) => Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .json(Bytes::from_static(FALLBACK_ERROR_BODY)),
    }
}

pub(crate) const FALLBACK_ERROR_BODY: &[u8] =
    br#"{"status":500,"kind":"Unknown","details":"Request failed with unknown error"}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::ErrorKind;

    #[test]
    fn errors_carry_their_status_and_json_content_type() {
        let res = error_response(&ApiError::new(StatusCode::NOT_FOUND, ErrorKind::NotFound, "nope"));
        assert_eq!(res.code(), StatusCode::NOT_FOUND);
        assert_eq!(res.header("content-type"), Some("application/json"));
        assert_eq!(
            res.body().as_ref(),
            br#"{"status":404,"kind":"Not Found","details":"nope"}"#
        );
    }

    #[test]
    fn into_inner_keeps_status_and_headers() {
        let inner = Response::builder()
            .status(StatusCode::CREATED)
            .json("{}")
            .into_inner();
        assert_eq!(inner.status(), StatusCode::CREATED);
        assert_eq!(inner.headers()["content-type"], "application/json");
    }

    #[test]
    fn status_only_has_no_body() {
        let res = Response::status(StatusCode::NO_CONTENT);
        assert!(res.body().is_empty());
        assert!(res.header("content-type").is_none());
    }
}
