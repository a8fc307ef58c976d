//! Handler parameters and their declared types.
//!
//! Every parameter of a wrapped function implements [`Param`], which hands
//! the adapter a [`ParamType`]: the parameter's `TypeId`, its name and the one
//! capability resolvers key off. The list of `ParamType`s is computed once,
//! when the function is wrapped; resolvers see it again on every request.
//!
//! | Capability | Types | Resolved by |
//! |---|---|---|
//! | context | [`Context`], [`Ctx<T>`] | the default resolver |
//! | json body | [`Json<T>`], opt-in user types | the default resolver |
//! | text | `String`, integers, `bool`, `f64` | route-variable resolvers |
//! | opaque | everything else | custom resolvers only |

use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::request::{Context, Request};

/// A resolved, type-erased argument, ready to be handed to the function.
///
/// Custom resolvers build one with `Box::new(value)`; the value's concrete
/// type must be the declared parameter type.
pub type Arg = Box<dyn Any + Send>;

/// Implemented by every type that may appear as a handler parameter.
///
/// The default describes the type as opaque. Opt a payload type into body
/// decoding with [`ParamType::json`]:
///
/// ```rust
/// use jsonfn::{Param, ParamType};
///
/// #[derive(serde::Deserialize)]
/// struct CreateUser { name: String }
///
/// impl Param for CreateUser {
///     fn param_type() -> ParamType { ParamType::json::<Self>() }
/// }
/// ```
pub trait Param: Send + Sized + 'static {
    fn param_type() -> ParamType {
        ParamType::opaque::<Self>()
    }
}

/// The declared type of one handler parameter.
#[derive(Clone, Copy)]
pub struct ParamType {
    id: TypeId,
    name: &'static str,
    pub(crate) capability: Capability,
}

#[derive(Clone, Copy)]
pub(crate) enum Capability {
    Opaque,
    Context(fn(&Request) -> Option<Arg>),
    JsonBody(fn(&[u8]) -> Result<Arg, serde_json::Error>),
    Text(fn(&str) -> Result<Arg, String>),
}

impl ParamType {
    /// A type only custom resolvers can supply.
    pub fn opaque<T: Send + 'static>() -> Self {
        Self::with::<T>(Capability::Opaque)
    }

    /// A type decoded from the JSON request body.
    pub fn json<T: DeserializeOwned + Send + 'static>() -> Self {
        Self::with::<T>(Capability::JsonBody(decode_json::<T>))
    }

    /// A type parsed from a text value such as a route variable.
    pub fn text<T>() -> Self
    where
        T: FromStr + Send + 'static,
        T::Err: fmt::Display,
    {
        Self::with::<T>(Capability::Text(parse_text::<T>))
    }

    /// A context type pulled out of the request by `extract`.
    ///
    /// `extract` returns `None` when the request carries no value assignable
    /// to this type.
    pub fn context<T: Send + 'static>(extract: fn(&Request) -> Option<Arg>) -> Self {
        Self::with::<T>(Capability::Context(extract))
    }

    fn with<T: 'static>(capability: Capability) -> Self {
        Self { id: TypeId::of::<T>(), name: type_name::<T>(), capability }
    }

    pub fn id(&self) -> TypeId { self.id }
    pub fn name(&self) -> &'static str { self.name }

    /// True when this is exactly the type `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    pub fn is_context(&self) -> bool {
        matches!(self.capability, Capability::Context(_))
    }

    pub fn is_json_body(&self) -> bool {
        matches!(self.capability, Capability::JsonBody(_))
    }

    pub fn accepts_text(&self) -> bool {
        matches!(self.capability, Capability::Text(_))
    }

    /// Parses `raw` into this type. `None` when the type has no text form.
    pub fn parse_text(&self, raw: &str) -> Option<Result<Arg, String>> {
        match self.capability {
            Capability::Text(parse) => Some(parse(raw)),
            _ => None,
        }
    }
}

impl fmt::Debug for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let capability = match self.capability {
            Capability::Opaque => "opaque",
            Capability::Context(_) => "context",
            Capability::JsonBody(_) => "json",
            Capability::Text(_) => "text",
        };
        f.debug_struct("ParamType")
            .field("name", &self.name)
            .field("capability", &capability)
            .finish()
    }
}

fn decode_json<T: DeserializeOwned + Send + 'static>(body: &[u8]) -> Result<Arg, serde_json::Error> {
    serde_json::from_slice::<T>(body).map(|v| Box::new(v) as Arg)
}

fn parse_text<T>(raw: &str) -> Result<Arg, String>
where
    T: FromStr + Send + 'static,
    T::Err: fmt::Display,
{
    raw.parse::<T>().map(|v| Box::new(v) as Arg).map_err(|e| e.to_string())
}

// ── Context ───────────────────────────────────────────────────────────────────

impl Param for Context {
    fn param_type() -> ParamType {
        ParamType::context::<Self>(|req| Some(Box::new(req.context().clone()) as Arg))
    }
}

/// A narrower, application-defined context value.
///
/// Middleware or the caller attaches it with
/// [`Request::with_extension`](crate::Request::with_extension); a handler
/// declaring `Ctx<T>` fails to resolve when the request carries no `T`.
#[derive(Clone, Debug)]
pub struct Ctx<T>(pub T);

impl<T> Deref for Ctx<T> {
    type Target = T;
    fn deref(&self) -> &T { &self.0 }
}

impl<T: Clone + Send + Sync + 'static> Param for Ctx<T> {
    fn param_type() -> ParamType {
        ParamType::context::<Self>(extract_ctx::<T>)
    }
}

fn extract_ctx<T: Clone + Send + Sync + 'static>(req: &Request) -> Option<Arg> {
    req.extensions().get::<T>().cloned().map(|v| Box::new(Ctx(v)) as Arg)
}

// ── Json ──────────────────────────────────────────────────────────────────────

/// A JSON payload.
///
/// As a parameter, the request body is decoded into `T`; declare
/// `Json<Box<T>>` to receive it behind a pointer. As a return value, `T` is
/// serialized into the response body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T { self.0 }
}

impl<T> Deref for Json<T> {
    type Target = T;
    fn deref(&self) -> &T { &self.0 }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T { &mut self.0 }
}

impl<T: Serialize> Serialize for Json<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<T: DeserializeOwned + Send + 'static> Param for Json<T> {
    fn param_type() -> ParamType {
        ParamType::with::<Self>(Capability::JsonBody(decode_json_wrapped::<T>))
    }
}

fn decode_json_wrapped<T: DeserializeOwned + Send + 'static>(body: &[u8]) -> Result<Arg, serde_json::Error> {
    serde_json::from_slice::<T>(body).map(|v| Box::new(Json(v)) as Arg)
}

// ── Text and opaque types ─────────────────────────────────────────────────────

macro_rules! text_params {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Param for $ty {
                fn param_type() -> ParamType { ParamType::text::<Self>() }
            }
        )*
    };
}

text_params!(String, bool, f64, i16, i32, i64, u16, u32, u64, usize);

impl<K: Send + 'static, V: Send + 'static> Param for HashMap<K, V> {}
impl<K: Send + 'static, V: Send + 'static> Param for BTreeMap<K, V> {}
impl<T: Send + 'static> Param for Vec<T> {}
impl Param for serde_json::Value {}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct Cmd {
        name: String,
    }

    #[test]
    fn capabilities() {
        assert!(Context::param_type().is_context());
        assert!(Ctx::<u8>::param_type().is_context());
        assert!(Json::<Cmd>::param_type().is_json_body());
        assert!(String::param_type().accepts_text());
        assert!(!HashMap::<String, String>::param_type().is_json_body());
        assert!(HashMap::<String, String>::param_type().is::<HashMap<String, String>>());
    }

    #[test]
    fn json_decodes_into_the_declared_wrapper() {
        let ty = Json::<Cmd>::param_type();
        let Capability::JsonBody(decode) = ty.capability else { panic!("not a json param") };

        let arg = decode(br#"{"name":"alice"}"#).unwrap();
        let cmd = arg.downcast::<Json<Cmd>>().unwrap();
        assert_eq!(cmd.name, "alice");
    }

    #[test]
    fn ctx_needs_a_matching_extension() {
        #[derive(Clone)]
        struct Tenant(&'static str);

        let Capability::Context(extract) = Ctx::<Tenant>::param_type().capability else {
            panic!("not a context param")
        };

        assert!(extract(&Request::new(Method::GET, "/")).is_none());

        let req = Request::new(Method::GET, "/").with_extension(Tenant("acme"));
        let ctx = extract(&req).unwrap().downcast::<Ctx<Tenant>>().unwrap();
        assert_eq!(ctx.0.0, "acme");
    }

    #[test]
    fn text_parse_errors_are_reported() {
        let ty = u32::param_type();
        assert!(ty.parse_text("42").unwrap().is_ok());
        assert!(ty.parse_text("forty-two").unwrap().is_err());
        assert!(Json::<Cmd>::param_type().parse_text("42").is_none());
    }
}
