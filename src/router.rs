//! Radix-tree request router.
//!
//! One tree per HTTP method. You register a path, you get a handler. A path
//! that exists under another method answers 405; anything else answers 404.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;
use tracing::debug;

use crate::fallback;
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each [`Router::on`] call returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax and are bound to handler parameters
    /// with [`JsonHandler::with_var`](crate::JsonHandler::with_var):
    ///
    /// ```rust
    /// # use jsonfn::{Json, Router, wrap};
    /// # use http::Method;
    /// # async fn get_user(id: u64) -> Json<u64> { Json(id) }
    /// # async fn delete_user(_id: u64) {}
    /// Router::new()
    ///     .on(Method::GET,    "/users/{id}", wrap(get_user).with_var("id", 0))
    ///     .on(Method::DELETE, "/users/{id}", wrap(delete_user).with_var("id", 0));
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    fn allows_other_method(&self, method: &Method, path: &str) -> bool {
        self.routes
            .iter()
            .any(|(m, tree)| m != method && tree.at(path).is_ok())
    }

    /// Routes one request and produces its response.
    pub async fn dispatch(&self, req: Request) -> Response {
        match self.lookup(req.method(), req.path()) {
            Some((handler, params)) => handler.call(req.with_params(params)).await,
            None if self.allows_other_method(req.method(), req.path()) => {
                debug!(method = %req.method(), path = req.path(), "method not allowed");
                fallback::method_not_allowed(req).await
            }
            None => {
                debug!(method = %req.method(), path = req.path(), "no route");
                fallback::not_found(req).await
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
