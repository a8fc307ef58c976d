//! JSON-Schema request validation.
//!
//! Attach with [`JsonHandler::with_schema`](crate::JsonHandler::with_schema).
//! The schema is compiled once, when the handler is built; an invalid schema
//! is a setup error, not a per-request one.

use serde_json::Value;

use crate::error::{Error, ValidateError};
use crate::request::Request;
use crate::validator::{Finding, RequestValidator};

/// Validates request bodies against a compiled JSON Schema.
pub struct SchemaValidator {
    validator: jsonschema::Validator,
}

impl SchemaValidator {
    pub fn new(schema: &Value) -> Result<Self, Error> {
        let validator = jsonschema::validator_for(schema).map_err(|e| Error::Schema(e.to_string()))?;
        Ok(Self { validator })
    }

    pub fn from_slice(schema: &[u8]) -> Result<Self, Error> {
        let schema: Value = serde_json::from_slice(schema).map_err(|e| Error::Schema(e.to_string()))?;
        Self::new(&schema)
    }
}

impl RequestValidator for SchemaValidator {
    fn validate(&self, req: &Request) -> Result<Vec<Finding>, ValidateError> {
        if req.body_is_blank() {
            return Err(ValidateError::EmptyBody);
        }

        let instance: Value = match serde_json::from_slice(req.body()) {
            Ok(v) => v,
            Err(e) => return Err(ValidateError::Unexpected(Box::new(e))),
        };

        let findings = self
            .validator
            .iter_errors(&instance)
            .map(|err| Finding::new(
                field_path(&err.instance_path.to_string()),
                err.instance.clone().into_owned(),
                err.to_string(),
            ))
            .collect();

        Ok(findings)
    }
}

const ROOT: &str = "(root)";

/// `/items/0/name` → `items.0.name`; the empty pointer is the root.
fn field_path(pointer: &str) -> String {
    let path = pointer.trim_start_matches('/');
    if path.is_empty() {
        ROOT.to_owned()
    } else {
        path.replace('/', ".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use serde_json::json;

    fn schema() -> SchemaValidator {
        SchemaValidator::new(&json!({
            "type": "object",
            "properties": {
                "id":   { "type": "string", "minLength": 3 },
                "name": { "type": "string", "minLength": 1 }
            }
        }))
        .unwrap()
    }

    fn post(body: &'static str) -> Request {
        Request::new(Method::POST, "/").with_body(body)
    }

    #[test]
    fn valid_body_has_no_findings() {
        assert!(schema().validate(&post(r#"{"id":"abc","name":"alice"}"#)).unwrap().is_empty());
    }

    #[test]
    fn each_violation_is_a_finding() {
        let findings = schema().validate(&post(r#"{"id":12,"name":""}"#)).unwrap();
        let fields: Vec<_> = findings.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, ["id", "name"]);
        assert_eq!(findings[0].value, json!(12));
        assert_eq!(findings[1].value, json!(""));
    }

    #[test]
    fn blank_body_is_an_empty_body_error() {
        assert!(matches!(schema().validate(&post("  ")), Err(ValidateError::EmptyBody)));
    }

    #[test]
    fn malformed_json_is_a_validator_error() {
        assert!(matches!(schema().validate(&post("{nope")), Err(ValidateError::Unexpected(_))));
    }

    #[test]
    fn invalid_schema_fails_at_setup() {
        assert!(matches!(SchemaValidator::new(&json!({"type": 12})), Err(Error::Schema(_))));
        assert!(matches!(SchemaValidator::from_slice(b"{"), Err(Error::Schema(_))));
    }

    #[test]
    fn pointers_become_dotted_paths() {
        assert_eq!(field_path(""), "(root)");
        assert_eq!(field_path("/name"), "name");
        assert_eq!(field_path("/items/0/name"), "items.0.name");
    }
}
