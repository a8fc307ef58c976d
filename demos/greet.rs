//! Minimal jsonfn demo: plain functions served as JSON endpoints.
//!
//! Run with:
//!   cargo run --example greet
//!
//! Try:
//!   curl -X POST http://localhost:3000/greet -d '{"name":"alice"}'
//!   curl -X POST http://localhost:3000/greet -d '{"name":""}'      # 400, findings
//!   curl -X POST http://localhost:3000/greet                       # 400, empty body
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/users/x                             # 500, bad route var
//!   curl -X PUT http://localhost:3000/greet                        # 405
//!   curl -X POST http://localhost:3000/boom                        # 500, contained panic

use std::time::Duration;

use http::{Method, StatusCode};
use jsonfn::{Context, DomainError, Json, Reply, Router, Server, wrap};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Deserialize)]
struct Greet {
    name: String,
}

#[derive(Serialize)]
struct Greeting {
    message: String,
}

#[derive(Serialize)]
struct User {
    id: u64,
    name: &'static str,
}

impl Reply for User {}

#[derive(Serialize)]
struct Accepted {
    queued: bool,
}

impl Reply for Accepted {
    fn status(&self) -> Option<StatusCode> { Some(StatusCode::ACCEPTED) }
}

#[tokio::main]
async fn main() -> Result<(), jsonfn::Error> {
    tracing_subscriber::fmt::init();

    let greet_schema = json!({
        "type": "object",
        "properties": { "name": { "type": "string", "minLength": 1 } },
        "required": ["name"]
    });

    let app = Router::new()
        .on(Method::POST, "/greet", wrap(greet).with_schema(&greet_schema)?)
        .on(Method::GET, "/users/{id}", wrap(get_user).with_var("id", 0))
        .on(Method::POST, "/jobs", wrap(enqueue))
        .on(Method::POST, "/boom", wrap(boom));

    Server::bind("0.0.0.0:3000")?
        .request_timeout(Duration::from_secs(5))
        .serve(app)
        .await
}

// POST /greet → 200 {"message": "..."}, or 400 "Domain Error" for a reserved name.
async fn greet(ctx: Context, cmd: Json<Greet>) -> Result<Json<Greeting>, DomainError> {
    if cmd.name == "admin" {
        return Err(DomainError::new("that name is reserved"));
    }
    tracing::info!(remaining = ?ctx.remaining(), "greeting {}", cmd.name);
    Ok(Json(Greeting { message: format!("hello, {}", cmd.name) }))
}

// GET /users/{id}
async fn get_user(id: u64) -> User {
    User { id, name: "alice" }
}

// POST /jobs → 202
async fn enqueue() -> Accepted {
    Accepted { queued: true }
}

// POST /boom → 500 "Unknown"; the server keeps running.
async fn boom() {
    panic!("something went very wrong");
}
