//! The request identity a lock key is derived from.
//!
//! [`RequestContext`] is a framework-neutral snapshot of an HTTP request:
//! the HTTP layer fills it in once per request, and both the key generator
//! and the acquire-fail policy read from it. It never carries the request
//! body stream or the downstream handler, so a policy cannot run the handler
//! by accident.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// Snapshot of a request's identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestContext {
    /// HTTP method, upper case (`"POST"`).
    pub method: String,
    /// Request path without the query string.
    pub path: String,
    /// Decoded query string parameters.
    pub query: Map<String, Value>,
    /// Matched route parameters (e.g. `id` for `/{id}`).
    pub params: Map<String, Value>,
    /// Parsed body, `Value::Null` when absent or not structured.
    pub body: Value,
    /// Lower-cased header names to their values.
    pub headers: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        RequestContext {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.query = query;
        self
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Merges query, body and path parameters into one mapping.
    ///
    /// Later sources overwrite earlier ones on a name collision, so path
    /// parameters win over body fields, which win over query parameters.
    /// An object body contributes its fields, an array body contributes its
    /// elements keyed by index, and any other body contributes nothing.
    pub fn merged_params(&self) -> Map<String, Value> {
        let mut merged = self.query.clone();

        match &self.body {
            Value::Object(fields) => {
                merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Value::Array(items) => {
                merged.extend(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, v)| (i.to_string(), v.clone())),
                );
            }
            _ => {}
        }

        merged.extend(self.params.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn path_params_override_body_and_query() {
        let ctx = RequestContext::new("POST", "/1")
            .with_query(object(json!({ "id": "q", "a": "query" })))
            .with_body(json!({ "id": "b", "a": "body", "b": 2 }))
            .with_params(object(json!({ "id": "1" })));

        let merged = ctx.merged_params();
        assert_eq!(merged["id"], json!("1"));
        assert_eq!(merged["a"], json!("body"));
        assert_eq!(merged["b"], json!(2));
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn array_body_merges_by_index() {
        let ctx = RequestContext::new("POST", "/1").with_body(json!(["x", "y"]));
        let merged = ctx.merged_params();
        assert_eq!(merged["0"], json!("x"));
        assert_eq!(merged["1"], json!("y"));
    }

    #[test]
    fn scalar_body_contributes_nothing() {
        let ctx = RequestContext::new("POST", "/1").with_body(json!(42));
        assert!(ctx.merged_params().is_empty());
    }
}
