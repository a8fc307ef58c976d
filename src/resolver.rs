//! Argument resolution.
//!
//! For every parameter of a wrapped function, in declaration order, the
//! handler asks its [`ResolverChain`] for a value. Each resolver in the chain
//! either handles the parameter, delegates it to the next resolver, or aborts
//! the request:
//!
//! ```text
//! VarInjector("id", 1)  ── pos 1 ──▶ Ok(Some(id))
//!        │ everything else: Ok(None)
//!        ▼
//! DefaultResolver       ── Context / Json<T> ──▶ Ok(Some(..)) or Err(..)
//!        │ anything else: Ok(None)
//!        ▼
//! ResolveError::Unsupported
//! ```
//!
//! Resolvers added later sit in front: the last one added is tried first.

use std::sync::Arc;

use tracing::debug;

use crate::error::ResolveError;
use crate::param::{Arg, Capability, ParamType};
use crate::request::Request;

/// Produces one argument from request state.
///
/// - `Ok(Some(arg))`: handled. `arg` must box a value of the declared type.
/// - `Ok(None)`: not mine, try the next resolver.
/// - `Err(_)`: stop resolving and fail the request.
pub trait ArgumentResolver: Send + Sync {
    fn resolve(&self, req: &Request, ty: &ParamType, pos: usize) -> Result<Option<Arg>, ResolveError>;
}

impl<F> ArgumentResolver for F
where
    F: Fn(&Request, &ParamType, usize) -> Result<Option<Arg>, ResolveError> + Send + Sync,
{
    fn resolve(&self, req: &Request, ty: &ParamType, pos: usize) -> Result<Option<Arg>, ResolveError> {
        self(req, ty, pos)
    }
}

// ── ResolverChain ─────────────────────────────────────────────────────────────

/// An ordered list of resolvers, front first.
#[derive(Clone)]
pub struct ResolverChain {
    resolvers: Vec<Arc<dyn ArgumentResolver>>,
}

impl ResolverChain {
    /// A chain with no resolvers. Every parameter is unsupported until one is added.
    pub fn empty() -> Self {
        Self { resolvers: Vec::new() }
    }

    /// Places `resolver` in front of every resolver already in the chain.
    pub fn push_front(&mut self, resolver: impl ArgumentResolver + 'static) {
        self.resolvers.insert(0, Arc::new(resolver));
    }

    /// Places `resolver` behind every resolver already in the chain.
    pub fn push_back(&mut self, resolver: impl ArgumentResolver + 'static) {
        self.resolvers.push(Arc::new(resolver));
    }

    pub fn len(&self) -> usize { self.resolvers.len() }
    pub fn is_empty(&self) -> bool { self.resolvers.is_empty() }

    /// Resolves one parameter, or fails with `Unsupported` when every
    /// resolver delegates.
    pub fn resolve_one(&self, req: &Request, ty: &ParamType, pos: usize) -> Result<Arg, ResolveError> {
        for resolver in &self.resolvers {
            if let Some(arg) = resolver.resolve(req, ty, pos)? {
                return Ok(arg);
            }
        }
        Err(ResolveError::Unsupported { pos, ty: ty.name() })
    }

    /// Resolves every parameter in order. The first failure aborts.
    pub fn resolve_all(&self, req: &Request, params: &[ParamType]) -> Result<Vec<Arg>, ResolveError> {
        let mut args = Vec::with_capacity(params.len());
        for (pos, ty) in params.iter().enumerate() {
            match self.resolve_one(req, ty, pos) {
                Ok(arg) => args.push(arg),
                Err(e) => {
                    debug!(pos, ty = ty.name(), error = %e, "argument resolution failed");
                    return Err(e);
                }
            }
        }
        Ok(args)
    }
}

/// A chain holding only the [`DefaultResolver`].
impl Default for ResolverChain {
    fn default() -> Self {
        let mut chain = Self::empty();
        chain.push_back(DefaultResolver);
        chain
    }
}

/// A chain can sit inside another chain.
impl ArgumentResolver for ResolverChain {
    fn resolve(&self, req: &Request, ty: &ParamType, pos: usize) -> Result<Option<Arg>, ResolveError> {
        for resolver in &self.resolvers {
            if let Some(arg) = resolver.resolve(req, ty, pos)? {
                return Ok(Some(arg));
            }
        }
        Ok(None)
    }
}

// ── DefaultResolver ───────────────────────────────────────────────────────────

/// Binds context parameters and decodes JSON bodies. Delegates everything else.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultResolver;

impl ArgumentResolver for DefaultResolver {
    fn resolve(&self, req: &Request, ty: &ParamType, pos: usize) -> Result<Option<Arg>, ResolveError> {
        match ty.capability {
            Capability::Context(extract) => extract(req).map(Some).ok_or_else(|| {
                ResolveError::resolution(pos, ty.name(), "request context is not assignable to the declared type")
            }),
            Capability::JsonBody(decode) => {
                if req.body_is_blank() {
                    return Err(ResolveError::EmptyBody);
                }
                decode(req.body())
                    .map(Some)
                    .map_err(|e| ResolveError::resolution(pos, ty.name(), e.to_string()))
            }
            Capability::Text(_) | Capability::Opaque => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::Method;

    use super::*;
    use crate::param::{Json, Param};
    use crate::request::Context;

    #[derive(Debug, serde::Deserialize)]
    struct Cmd {
        name: String,
    }

    fn req(body: &'static str) -> Request {
        Request::new(Method::POST, "/").with_body(body)
    }

    #[test]
    fn default_resolves_context_and_json() {
        let chain = ResolverChain::default();
        let params = [Context::param_type(), Json::<Cmd>::param_type()];

        let mut args = chain.resolve_all(&req(r#"{"name":"bob"}"#), &params).unwrap().into_iter();
        assert!(args.next().unwrap().downcast::<Context>().is_ok());
        assert_eq!(args.next().unwrap().downcast::<Json<Cmd>>().unwrap().name, "bob");
    }

    #[test]
    fn blank_body_is_empty_body() {
        let err = ResolverChain::default()
            .resolve_one(&req(""), &Json::<Cmd>::param_type(), 0)
            .unwrap_err();
        assert!(matches!(err, ResolveError::EmptyBody));
    }

    #[test]
    fn malformed_body_is_a_resolution_error() {
        let err = ResolverChain::default()
            .resolve_one(&req(r#"{"name":1}"#), &Json::<Cmd>::param_type(), 2)
            .unwrap_err();
        assert!(matches!(err, ResolveError::Resolution { pos: 2, .. }));
    }

    #[test]
    fn unknown_types_are_unsupported() {
        let err = ResolverChain::default()
            .resolve_one(&req(""), &HashMap::<String, String>::param_type(), 1)
            .unwrap_err();
        assert!(matches!(err, ResolveError::Unsupported { pos: 1, .. }));
    }

    #[test]
    fn last_pushed_front_is_tried_first() {
        let mut chain = ResolverChain::default();
        chain.push_front(|_: &Request, _: &ParamType, _: usize| -> Result<Option<Arg>, ResolveError> {
            Ok(Some(Box::new(1u32)))
        });
        chain.push_front(|_: &Request, _: &ParamType, pos: usize| -> Result<Option<Arg>, ResolveError> {
            Ok((pos == 0).then(|| Box::new(2u32) as Arg))
        });

        let params = [u32::param_type(), u32::param_type()];
        let args: Vec<u32> = chain
            .resolve_all(&req(""), &params)
            .unwrap()
            .into_iter()
            .map(|a| *a.downcast::<u32>().unwrap())
            .collect();
        assert_eq!(args, [2, 1]);
    }

    #[test]
    fn first_failure_stops_resolution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let mut chain = ResolverChain::empty();
        chain.push_back(move |_: &Request, _: &ParamType, pos: usize| -> Result<Option<Arg>, ResolveError> {
            seen.fetch_add(1, Ordering::SeqCst);
            Err(ResolveError::resolution(pos, "u32", "nope"))
        });

        let params = [u32::param_type(), u32::param_type(), u32::param_type()];
        assert!(chain.resolve_all(&req(""), &params).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
