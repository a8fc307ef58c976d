use http::{Method, StatusCode};
use jsonfn::{Context, Json, Request, Router, wrap};
use serde_json::{Value, json};

async fn get_user(id: u64) -> Json<Value> {
    Json(json!({"id": id}))
}

async fn delete_user(_id: u64) {}

async fn where_am_i(ctx: Context) -> Json<String> {
    Json(ctx.path().to_owned())
}

fn app() -> Router {
    Router::new()
        .on(Method::GET, "/users/{id}", wrap(get_user).with_var("id", 0))
        .on(Method::DELETE, "/users/{id}", wrap(delete_user).with_var("id", 0))
        .on(Method::GET, "/whoami", wrap(where_am_i))
}

fn body(res: &jsonfn::Response) -> Value {
    serde_json::from_slice(res.body()).unwrap()
}

#[tokio::test]
async fn route_vars_reach_the_handler() {
    let res = app().dispatch(Request::new(Method::GET, "/users/42")).await;
    assert_eq!(res.code(), StatusCode::OK);
    assert_eq!(body(&res), json!({"id": 42}));

    let res = app().dispatch(Request::new(Method::DELETE, "/users/42")).await;
    assert_eq!(res.code(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn unparsable_route_vars_are_handler_errors() {
    let res = app().dispatch(Request::new(Method::GET, "/users/abc")).await;
    assert_eq!(res.code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body(&res)["kind"], "Handler Error");
}

#[tokio::test]
async fn handlers_see_the_request_context() {
    let res = app().dispatch(Request::new(Method::GET, "/whoami")).await;
    assert_eq!(body(&res), json!("/whoami"));
}

#[tokio::test]
async fn unknown_paths_are_404() {
    let res = app().dispatch(Request::new(Method::GET, "/nope")).await;
    assert_eq!(res.code(), StatusCode::NOT_FOUND);
    assert_eq!(
        body(&res),
        json!({
            "status": 404,
            "kind": "Not Found",
            "details": "Handler not found for request",
            "meta": {"method": "GET", "path": "/nope"}
        })
    );
}

#[tokio::test]
async fn known_paths_with_other_methods_are_405() {
    let res = app().dispatch(Request::new(Method::PUT, "/users/42")).await;
    assert_eq!(res.code(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        body(&res),
        json!({
            "status": 405,
            "kind": "Method Not Allowed",
            "details": "Method not allowed for request",
            "meta": {"method": "PUT", "path": "/users/42"}
        })
    );
}

#[test]
#[should_panic(expected = "invalid route")]
fn conflicting_routes_panic_at_setup() {
    Router::new()
        .on(Method::GET, "/users/{id}", wrap(get_user).with_var("id", 0))
        .on(Method::GET, "/users/{name}", wrap(get_user).with_var("name", 0));
}
