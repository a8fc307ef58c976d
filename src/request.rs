//! Incoming HTTP request type.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method};

/// An incoming HTTP request with its body fully buffered.
///
/// The body is an immutable [`Bytes`] buffer: validators and resolvers may
/// read it as many times as they like without consuming it.
pub struct Request {
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) extensions: Extensions,
    pub(crate) context: Context,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: HashMap::new(),
            extensions: Extensions::new(),
            context: Context {
                method,
                path: path.into(),
                deadline: None,
            },
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    /// Attaches a typed value that handlers can receive through [`Ctx<T>`](crate::Ctx).
    pub fn with_extension<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    /// Sets the advisory deadline carried by the request [`Context`].
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.context.deadline = Some(deadline);
        self
    }

    pub fn method(&self) -> &Method { &self.context.method }
    pub fn path(&self) -> &str { &self.context.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }
    pub fn params(&self) -> &HashMap<String, String> { &self.params }
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn context(&self) -> &Context { &self.context }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// True when the body is empty or holds nothing but whitespace.
    pub(crate) fn body_is_blank(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }
}

/// Ambient per-request context.
///
/// Handlers receive it by declaring a [`Context`] parameter. The deadline is
/// advisory: jsonfn never cancels a handler, it only tells it how long the
/// caller is willing to wait.
#[derive(Clone, Debug)]
pub struct Context {
    method: Method,
    path: String,
    deadline: Option<Instant>,
}

impl Context {
    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn deadline(&self) -> Option<Instant> { self.deadline }

    /// Time left before the deadline. `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_bodies() {
        assert!(Request::new(Method::POST, "/").body_is_blank());
        assert!(Request::new(Method::POST, "/").with_body(" \n\t").body_is_blank());
        assert!(!Request::new(Method::POST, "/").with_body("{}").body_is_blank());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::new(Method::GET, "/")
            .with_header(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert_eq!(req.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn deadline_in_the_past_is_expired() {
        let req = Request::new(Method::GET, "/").with_deadline(Instant::now());
        assert!(req.context().is_expired());
        assert_eq!(req.context().remaining(), Some(Duration::ZERO));
        assert!(!Request::new(Method::GET, "/").context().is_expired());
    }
}
