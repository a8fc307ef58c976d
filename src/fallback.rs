//! Responses for requests no route accepts.

use http::StatusCode;

use crate::failure::{ApiError, ErrorKind};
use crate::request::Request;
use crate::response::{Response, error_response};

/// `404 Not Found`, with the request's method and path under `meta`.
pub async fn not_found(req: Request) -> Response {
    error_response(&with_request_meta(
        ApiError::new(StatusCode::NOT_FOUND, ErrorKind::NotFound, "Handler not found for request"),
        &req,
    ))
}

/// `405 Method Not Allowed`, with the request's method and path under `meta`.
pub async fn method_not_allowed(req: Request) -> Response {
    error_response(&with_request_meta(
        ApiError::new(StatusCode::METHOD_NOT_ALLOWED, ErrorKind::MethodNotAllowed, "Method not allowed for request"),
        &req,
    ))
}

fn with_request_meta(err: ApiError, req: &Request) -> ApiError {
    err.with_meta("method", req.method().as_str()).with_meta("path", req.path())
}

#[cfg(test)]
mod tests {
    use http::Method;
    use serde_json::{Value, json};

    use super::*;

    #[tokio::test]
    async fn not_found_reports_the_request() {
        let res = not_found(Request::new(Method::GET, "/nowhere")).await;
        assert_eq!(res.code(), StatusCode::NOT_FOUND);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(
            body,
            json!({
                "status": 404,
                "kind": "Not Found",
                "details": "Handler not found for request",
                "meta": {"method": "GET", "path": "/nowhere"}
            })
        );
    }

    #[tokio::test]
    async fn method_not_allowed_reports_the_request() {
        let res = method_not_allowed(Request::new(Method::DELETE, "/users")).await;
        assert_eq!(res.code(), StatusCode::METHOD_NOT_ALLOWED);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["kind"], "Method Not Allowed");
        assert_eq!(body["meta"]["method"], "DELETE");
    }
}
