//! # REST API Interface Layer
//!
//! HTTP endpoints under `/api/v1`. This layer handles:
//! - Request body parsing (bodies are read raw so malformed JSON gets the legacy 400 reply)
//! - Error translation from domain failures to HTTP status codes
//! - Request logging
//!
//! ## Endpoints
//!
//! - **GET /status**: Liveness probe
//! - **POST /create/:model**: Create one object or an array of objects
//! - **POST /delete/:model**: Delete by primary key, `{"ids": [...]}`
//! - **GET /all/:model**: Every row of a model keyed by record key
//! - **GET /count[/:model]?db=**: Row counts per physical database
//! - **POST /sell**: Record sales (header plus lines)

pub mod mappers;
pub mod model_apis;
pub mod sales_apis;
pub mod status_apis;

use serde_json::Value;

/// Parse a request body as JSON, treating empty and falsy documents as absent
pub(crate) fn json_body(body: &[u8]) -> Option<Value> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let empty = match &value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Object(object) => object.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Number(_) => false,
    };
    (!empty).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_body_rejects_empty_documents() {
        assert_eq!(json_body(b""), None);
        assert_eq!(json_body(b"{"), None);
        assert_eq!(json_body(b"{}"), None);
        assert_eq!(json_body(b"[]"), None);
        assert_eq!(json_body(b"null"), None);
        assert_eq!(json_body(br#"{"ids": []}"#), Some(json!({"ids": []})));
    }
}
