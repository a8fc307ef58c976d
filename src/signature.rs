//! Function signatures, captured once at wrap time.
//!
//! # How an arbitrary function becomes callable
//!
//! A handler may take any number of parameters (up to twelve) of any types
//! implementing [`Param`]. The signature is not known to the adapter, so it
//! is described once, when the function is wrapped:
//!
//! ```text
//! async fn greet(ctx: Context, cmd: Json<Greet>) -> Result<Json<Hello>, DomainError>
//!        ↓ wrap(greet)
//! <F as HandlerFn<(Context, Json<Greet>)>>      ← picked by arity at compile time
//!        ↓ Signature::describe
//! params: [Context, Json<Greet>]  shape: Fallible  ← recorded once
//!        ↓ per request
//! resolvers fill Vec<Arg>  →  invoke downcasts each Arg  →  greet(ctx, cmd).await
//! ```
//!
//! Return values are normalized through [`IntoOutcome`]:
//!
//! | Return type | Shape | Success response |
//! |---|---|---|
//! | `()` | `Nothing` | 204, empty body |
//! | `T: Reply` | `Value` | 200 (or `T::status()`), JSON body |
//! | `Result<T: Reply, E: Into<Failure>>` | `Fallible` | as above, or an error |
//!
//! An unsupported signature does not compile.

use std::any::type_name;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

use futures::future::BoxFuture;
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::error::ResolveError;
use crate::failure::Failure;
use crate::param::{Arg, Json, Param, ParamType};

// ── Reply ─────────────────────────────────────────────────────────────────────

/// A success value a handler can return.
///
/// Implement it on your response types. Override [`status`](Reply::status)
/// to answer with something other than `200 OK`:
///
/// ```rust
/// use http::StatusCode;
/// use jsonfn::Reply;
///
/// #[derive(serde::Serialize)]
/// struct Created { id: u64 }
///
/// impl Reply for Created {
///     fn status(&self) -> Option<StatusCode> { Some(StatusCode::CREATED) }
/// }
/// ```
pub trait Reply: Serialize + Send + Sized + 'static {
    /// True for types that never carry a body.
    const NO_CONTENT: bool = false;

    fn status(&self) -> Option<StatusCode> {
        None
    }

    /// Serializes the value. `Ok(None)` means "no content".
    fn into_payload(self) -> Result<Option<Payload>, serde_json::Error> {
        let status = self.status();
        let body = serde_json::to_value(&self)?;
        Ok(Some(Payload { status, body }))
    }
}

impl Reply for () {
    const NO_CONTENT: bool = true;

    fn into_payload(self) -> Result<Option<Payload>, serde_json::Error> {
        Ok(None)
    }
}

/// `None` answers `204 No Content`.
impl<T: Reply> Reply for Option<T> {
    fn status(&self) -> Option<StatusCode> {
        self.as_ref().and_then(T::status)
    }

    fn into_payload(self) -> Result<Option<Payload>, serde_json::Error> {
        match self {
            Some(v) => v.into_payload(),
            None => Ok(None),
        }
    }
}

impl<T: Serialize + Send + 'static> Reply for Json<T> {}
impl<T: Serialize + Send + 'static> Reply for Vec<T> {}
impl<V: Serialize + Send + 'static> Reply for HashMap<String, V> {}
impl<V: Serialize + Send + 'static> Reply for BTreeMap<String, V> {}
impl Reply for Value {}
impl Reply for String {}

/// A serialized success value and the status it asked for.
#[derive(Clone, Debug, PartialEq)]
pub struct Payload {
    pub status: Option<StatusCode>,
    pub body: Value,
}

/// What one invocation produced: a value, no content, or a failure.
pub type Outcome = Result<Option<Payload>, Failure>;

// ── IntoOutcome ───────────────────────────────────────────────────────────────

/// The shape of a handler's return value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReturnShape {
    /// Always "no content".
    Nothing,
    /// A value that cannot fail.
    Value,
    /// A value or an error.
    Fallible,
}

/// Implemented by every supported handler return type.
pub trait IntoOutcome: Send + 'static {
    const SHAPE: ReturnShape;

    fn into_outcome(self) -> Outcome;
}

impl<T: Reply> IntoOutcome for T {
    const SHAPE: ReturnShape = if T::NO_CONTENT { ReturnShape::Nothing } else { ReturnShape::Value };

    fn into_outcome(self) -> Outcome {
        self.into_payload().map_err(Failure::unexpected)
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: Reply,
    E: Into<Failure> + Send + 'static,
{
    const SHAPE: ReturnShape = ReturnShape::Fallible;

    fn into_outcome(self) -> Outcome {
        match self {
            Ok(v) => v.into_outcome(),
            Err(e) => Err(e.into()),
        }
    }
}

// ── HandlerFn ─────────────────────────────────────────────────────────────────

/// Implemented for every `async` function (or closure returning a future)
/// whose parameters are all [`Param`] and whose output is [`IntoOutcome`].
///
/// `Args` is the tuple of parameter types; it only exists to tell the
/// per-arity implementations apart.
pub trait HandlerFn<Args>: Send + Sync + 'static {
    fn params() -> Vec<ParamType>;

    fn shape() -> ReturnShape;

    /// Calls the function with resolved arguments, one per parameter, in order.
    fn call(&self, args: Vec<Arg>) -> Result<BoxFuture<'static, Outcome>, ResolveError>;
}

/// Takes the next argument and downcasts it to the declared type.
fn take<T: Param>(args: &mut std::vec::IntoIter<Arg>, pos: &mut usize) -> Result<T, ResolveError> {
    let at = *pos;
    *pos += 1;
    let arg = args
        .next()
        .ok_or_else(|| ResolveError::resolution(at, type_name::<T>(), "no argument was resolved"))?;
    arg.downcast::<T>()
        .map(|v| *v)
        .map_err(|_| ResolveError::resolution(at, type_name::<T>(), "resolved value cannot be assigned to the declared type"))
}

macro_rules! impl_handler_fn {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, Fut, R, $($ty,)*> HandlerFn<($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoOutcome,
            $( $ty: Param, )*
        {
            fn params() -> Vec<ParamType> {
                vec![$(<$ty as Param>::param_type(),)*]
            }

            fn shape() -> ReturnShape {
                R::SHAPE
            }

            fn call(&self, args: Vec<Arg>) -> Result<BoxFuture<'static, Outcome>, ResolveError> {
                let mut args = args.into_iter();
                let mut pos = 0usize;
                $(
                    let $ty = take::<$ty>(&mut args, &mut pos)?;
                )*

                let fut = (self)($($ty,)*);
                Ok(Box::pin(async move { fut.await.into_outcome() }))
            }
        }
    };
}

impl_handler_fn!();
impl_handler_fn!(T1);
impl_handler_fn!(T1, T2);
impl_handler_fn!(T1, T2, T3);
impl_handler_fn!(T1, T2, T3, T4);
impl_handler_fn!(T1, T2, T3, T4, T5);
impl_handler_fn!(T1, T2, T3, T4, T5, T6);
impl_handler_fn!(T1, T2, T3, T4, T5, T6, T7);
impl_handler_fn!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_handler_fn!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_handler_fn!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_handler_fn!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_handler_fn!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);

// ── Signature ─────────────────────────────────────────────────────────────────

/// The compiled calling convention of one wrapped function.
pub struct Signature {
    params: Vec<ParamType>,
    shape: ReturnShape,
    invoker: Box<dyn Invoke>,
}

trait Invoke: Send + Sync {
    fn invoke(&self, args: Vec<Arg>) -> Result<BoxFuture<'static, Outcome>, ResolveError>;
}

struct FnInvoker<F, Args> {
    f: F,
    _args: PhantomData<fn() -> Args>,
}

impl<F, Args> Invoke for FnInvoker<F, Args>
where
    F: HandlerFn<Args>,
    Args: 'static,
{
    fn invoke(&self, args: Vec<Arg>) -> Result<BoxFuture<'static, Outcome>, ResolveError> {
        self.f.call(args)
    }
}

impl Signature {
    pub fn describe<F, Args>(f: F) -> Self
    where
        F: HandlerFn<Args>,
        Args: 'static,
    {
        Self {
            params: F::params(),
            shape: F::shape(),
            invoker: Box::new(FnInvoker { f, _args: PhantomData }),
        }
    }

    pub fn params(&self) -> &[ParamType] { &self.params }
    pub fn arity(&self) -> usize { self.params.len() }
    pub fn shape(&self) -> ReturnShape { self.shape }

    /// Starts the call. Fails when `args` does not match the parameters.
    pub fn invoke(&self, args: Vec<Arg>) -> Result<BoxFuture<'static, Outcome>, ResolveError> {
        self.invoker.invoke(args)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("params", &self.params)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::failure::DomainError;
    use crate::request::Context;

    #[derive(serde::Serialize)]
    struct Created {
        id: u32,
    }

    impl Reply for Created {
        fn status(&self) -> Option<StatusCode> {
            Some(StatusCode::CREATED)
        }
    }

    async fn nothing() {}
    async fn value(n: u32) -> Json<u32> { Json(n * 2) }
    async fn fallible(ctx: Context, n: u32) -> Result<Created, DomainError> {
        let _ = ctx;
        if n == 0 { Err(DomainError::new("zero")) } else { Ok(Created { id: n }) }
    }

    #[test]
    fn shapes_and_params_are_recorded() {
        let sig = Signature::describe(nothing);
        assert_eq!(sig.arity(), 0);
        assert_eq!(sig.shape(), ReturnShape::Nothing);

        let sig = Signature::describe(value);
        assert_eq!(sig.shape(), ReturnShape::Value);
        assert!(sig.params()[0].is::<u32>());

        let sig = Signature::describe(fallible);
        assert_eq!(sig.shape(), ReturnShape::Fallible);
        assert!(sig.params()[0].is_context());
        assert!(sig.params()[1].is::<u32>());
    }

    #[tokio::test]
    async fn invoke_demultiplexes_outputs() {
        assert_eq!(Signature::describe(nothing).invoke(vec![]).unwrap().await.unwrap(), None);

        let out = Signature::describe(value).invoke(vec![Box::new(21u32) as Arg]).unwrap().await.unwrap();
        assert_eq!(out, Some(Payload { status: None, body: Value::from(42u32) }));

        let ctx = || Box::new(crate::Request::new(http::Method::GET, "/").context().clone()) as Arg;
        let sig = Signature::describe(fallible);

        let ok = sig.invoke(vec![ctx(), Box::new(7u32) as Arg]).unwrap().await.unwrap().unwrap();
        assert_eq!(ok.status, Some(StatusCode::CREATED));
        assert_eq!(ok.body, serde_json::json!({"id": 7}));

        let err = sig.invoke(vec![ctx(), Box::new(0u32) as Arg]).unwrap().await.unwrap_err();
        assert!(matches!(err, Failure::Domain(_)));
    }

    #[test]
    fn mismatched_arguments_are_rejected() {
        let sig = Signature::describe(value);
        assert!(matches!(
            sig.invoke(vec![Box::new("21") as Arg]),
            Err(ResolveError::Resolution { pos: 0, .. })
        ));
        assert!(sig.invoke(vec![]).is_err());
    }

    #[tokio::test]
    async fn none_is_no_content() {
        async fn maybe(found: bool) -> Option<HashMap<String, u8>> {
            found.then(|| HashMap::from([("a".to_owned(), 1)]))
        }
        let sig = Signature::describe(maybe);
        assert_eq!(sig.shape(), ReturnShape::Value);
        assert_eq!(sig.invoke(vec![Box::new(false) as Arg]).unwrap().await.unwrap(), None);
        assert!(sig.invoke(vec![Box::new(true) as Arg]).unwrap().await.unwrap().is_some());
    }
}
