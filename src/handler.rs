//! The JSON handler and its type erasure.
//!
//! # Request lifecycle
//!
//! ```text
//! validate ──findings/err/panic──┐
//!    │                           │
//! resolve  ──err/panic───────────┤
//!    │                           ▼
//! invoke   ──err/panic────────▶ cast ──▶ log (once)
//!    │                           │
//!    ▼                           ▼
//! send(value)                send(error)
//! ```
//!
//! Every failure, wherever it comes from, goes through the caster before it
//! reaches the sender. The sender writes exactly one response per request.
//!
//! # How handlers are stored
//!
//! The router holds handlers of different function types in one
//! `HashMap<Method, Tree>`. A [`JsonHandler`] already hides its function
//! behind a [`Signature`], and is then shared as a trait object:
//!
//! ```text
//! wrap(create_user).with_var("id", 0)      ← JsonHandler
//!        ↓ router.on(Method::POST, "/users/{id}", handler)
//! Arc::new(Shared(Arc::new(handler)))      ← BoxedHandler = Arc<dyn ErasedHandler>
//!        ↓ per request
//! handler.call(req)                        ← one vtable dispatch, one Arc clone
//! ```

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tracing::debug;

use crate::caster::{DefaultCaster, ErrorCaster};
use crate::error::Error;
use crate::failure::Failure;
use crate::logger::{ErrorLogger, TracingLogger};
use crate::request::Request;
use crate::resolver::{ArgumentResolver, ResolverChain};
use crate::response::Response;
use crate::schema::SchemaValidator;
use crate::sender::{JsonSender, Output, ResponseSender};
use crate::signature::{HandlerFn, Outcome, Signature};
use crate::validator::{NoopValidator, RequestValidator};
use crate::vars::VarInjector;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Anything the [`Router`](crate::Router) accepts.
///
/// Sealed: build one with [`wrap`].
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl private::Sealed for JsonHandler {}

impl Handler for JsonHandler {
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(Shared(Arc::new(self)))
    }
}

struct Shared(Arc<JsonHandler>);

impl ErasedHandler for Shared {
    fn call(&self, req: Request) -> BoxFuture {
        let handler = Arc::clone(&self.0);
        Box::pin(async move { handler.handle(req).await })
    }
}

// ── JsonHandler ───────────────────────────────────────────────────────────────

/// Wraps `f` into a [`JsonHandler`] with the default pipeline.
///
/// ```rust
/// use jsonfn::{Context, DomainError, Json, wrap};
///
/// #[derive(serde::Deserialize)]
/// struct Greet { name: String }
///
/// async fn greet(_ctx: Context, cmd: Json<Greet>) -> Result<Json<String>, DomainError> {
///     if cmd.name.is_empty() {
///         return Err(DomainError::new("name is required"));
///     }
///     Ok(Json(format!("hello, {}", cmd.name)))
/// }
///
/// let handler = wrap(greet);
/// assert_eq!(handler.signature().arity(), 2);
/// ```
pub fn wrap<F, Args>(f: F) -> JsonHandler
where
    F: HandlerFn<Args>,
    Args: 'static,
{
    JsonHandler::new(f)
}

/// A wrapped function plus the pluggable stages of its pipeline.
///
/// Configure it while building; once handed to a router it is only read.
///
/// | Stage | Default |
/// |---|---|
/// | validator | [`NoopValidator`] |
/// | resolvers | [`ResolverChain::default`] |
/// | caster | [`DefaultCaster`] |
/// | logger | [`TracingLogger`] |
/// | sender | [`JsonSender`] |
pub struct JsonHandler {
    signature: Signature,
    validator: Arc<dyn RequestValidator>,
    resolvers: ResolverChain,
    caster: Arc<dyn ErrorCaster>,
    logger: Arc<dyn ErrorLogger>,
    sender: Arc<dyn ResponseSender>,
    skip_panic: bool,
}

impl JsonHandler {
    pub fn new<F, Args>(f: F) -> Self
    where
        F: HandlerFn<Args>,
        Args: 'static,
    {
        Self {
            signature: Signature::describe(f),
            validator: Arc::new(NoopValidator),
            resolvers: ResolverChain::default(),
            caster: Arc::new(DefaultCaster::default()),
            logger: Arc::new(TracingLogger),
            sender: Arc::new(JsonSender),
            skip_panic: false,
        }
    }

    pub fn with_validator(mut self, validator: impl RequestValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    /// Validates request bodies against `schema`.
    ///
    /// Fails when the schema itself is invalid.
    pub fn with_schema(self, schema: &Value) -> Result<Self, Error> {
        Ok(self.with_validator(SchemaValidator::new(schema)?))
    }

    /// Puts `resolver` in front of the chain.
    pub fn with_resolver(mut self, resolver: impl ArgumentResolver + 'static) -> Self {
        self.resolvers.push_front(resolver);
        self
    }

    /// Replaces the whole chain.
    pub fn with_resolvers(mut self, chain: ResolverChain) -> Self {
        self.resolvers = chain;
        self
    }

    /// Binds the route variable `key` to the parameter at `pos`.
    pub fn with_var(self, key: impl Into<String>, pos: usize) -> Self {
        self.with_resolver(VarInjector::new(key, pos))
    }

    /// Like [`with_var`](Self::with_var), with the variables read from `source`.
    pub fn with_var_from<S>(self, key: impl Into<String>, pos: usize, source: S) -> Self
    where
        S: Fn(&Request) -> HashMap<String, String> + Send + Sync + 'static,
    {
        self.with_resolver(VarInjector::with_source(key, pos, Arc::new(source)))
    }

    pub fn with_caster(mut self, caster: impl ErrorCaster + 'static) -> Self {
        self.caster = Arc::new(caster);
        self
    }

    /// Uses the default caster, keeping domain errors as logged causes when `yes`.
    pub fn log_domain_errors(self, yes: bool) -> Self {
        self.with_caster(DefaultCaster::new(yes))
    }

    pub fn with_logger(mut self, logger: impl ErrorLogger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    pub fn with_sender(mut self, sender: impl ResponseSender + 'static) -> Self {
        self.sender = Arc::new(sender);
        self
    }

    /// Lets panics from any stage unwind through the handler.
    ///
    /// For debugging only: a panic then takes down the connection task.
    pub fn skip_panic(mut self, skip: bool) -> Self {
        self.skip_panic = skip;
        self
    }

    pub fn signature(&self) -> &Signature { &self.signature }

    /// Runs the whole pipeline for one request.
    ///
    /// A panic in any stage (validator, resolvers or the function) becomes a
    /// failure response unless [`skip_panic`](Self::skip_panic) is set.
    pub async fn handle(&self, req: Request) -> Response {
        let outcome = if self.skip_panic {
            self.run(&req).await
        } else {
            AssertUnwindSafe(self.run(&req))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(Failure::Panic(payload)))
        };

        let out = match outcome {
            Ok(None) => Output::NoContent,
            Ok(Some(payload)) => Output::Value(payload),
            Err(failure) => {
                let err = self.caster.cast(failure);
                self.logger.log_error(&req, &err);
                Output::Error(err)
            }
        };
        self.sender.send(&req, out)
    }

    async fn run(&self, req: &Request) -> Outcome {
        let findings = self.validator.validate(req)?;
        if !findings.is_empty() {
            debug!(path = req.path(), findings = findings.len(), "request failed validation");
            return Err(Failure::Findings(findings));
        }

        let args = self.resolvers.resolve_all(req, self.signature.params())?;
        self.signature.invoke(args)?.await
    }
}
