//! # jsonfn
//!
//! Turn plain async functions into JSON HTTP handlers.
//!
//! You write a function with typed parameters and a typed result. jsonfn
//! works out, once, how to call it; then for every request it:
//!
//! - validates the request (no-op by default, JSON Schema on request)
//! - resolves each parameter from the request, by type and position
//! - calls the function, containing any panic to that one request
//! - casts every failure into one error shape, logs it, and sends it as JSON
//!
//! ## The error contract
//!
//! Every failure, from a validator, a resolver, the function or a panic,
//! reaches the client as the same JSON shape:
//!
//! ```json
//! {"status": 400, "kind": "Invalid Request", "details": "Request body validation has failed",
//!  "errors": [{"field": "name", "value": "", "msg": "\"\" is shorter than 1 character"}]}
//! ```
//!
//! `kind` is one of `Unknown`, `Domain Error`, `Handler Error`,
//! `Invalid Request`, `Not Found` or `Method Not Allowed`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::Method;
//! use jsonfn::{Context, DomainError, Json, Router, Server, wrap};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize)]
//! struct CreateUser { name: String }
//!
//! #[derive(Serialize)]
//! struct User { id: u64, name: String }
//!
//! async fn create_user(_ctx: Context, cmd: Json<CreateUser>) -> Result<Json<User>, DomainError> {
//!     if cmd.name == "root" {
//!         return Err(DomainError::new("name is reserved"));
//!     }
//!     Ok(Json(User { id: 99, name: cmd.0.name }))
//! }
//!
//! async fn get_user(id: u64) -> Json<User> {
//!     Json(User { id, name: "alice".into() })
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), jsonfn::Error> {
//!     let app = Router::new()
//!         .on(Method::GET,  "/users/{id}", wrap(get_user).with_var("id", 0))
//!         .on(Method::POST, "/users",      wrap(create_user));
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//! ```

mod caster;
mod error;
mod failure;
mod fallback;
mod handler;
mod logger;
mod param;
mod request;
mod resolver;
mod response;
mod router;
mod schema;
mod sender;
mod server;
mod signature;
mod validator;
mod vars;

pub use caster::{DefaultCaster, ErrorCaster};
pub use error::{BoxError, Error, ResolveError, ValidateError};
pub use failure::{ApiError, DomainError, ErrorKind, Failure, PanicError, PanicPayload, ReportStatus};
pub use fallback::{method_not_allowed, not_found};
pub use handler::{Handler, JsonHandler, wrap};
pub use logger::{ErrorLogger, TracingLogger};
pub use param::{Arg, Ctx, Json, Param, ParamType};
pub use request::{Context, Request};
pub use resolver::{ArgumentResolver, DefaultResolver, ResolverChain};
pub use response::{Response, ResponseBuilder, error_response};
pub use router::Router;
pub use schema::SchemaValidator;
pub use sender::{JsonSender, Output, ResponseSender};
pub use server::Server;
pub use signature::{HandlerFn, IntoOutcome, Outcome, Payload, Reply, ReturnShape, Signature};
pub use validator::{Finding, NoopValidator, RequestValidator};
pub use vars::{VarInjector, VarSource, route_params};
