//! Wire types for the GraphQL response envelope.
//!
//! # Design
//! The envelope is generic over the caller's destination type so `data` is
//! decoded straight into it without an intermediate `serde_json::Value`.
//! Both keys may be missing or `null`; neither case is an error on its own.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single entry of the envelope's `errors` array.
///
/// Only `message` is required; the other standard fields are kept when the
/// server sends them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<Location>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// Position of an error in the query document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// The top-level `{"data": ..., "errors": [...]}` object. Missing keys
/// decode as `None`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQlError>>,
}

/// Outgoing JSON body.
#[derive(Debug, Serialize)]
pub(crate) struct JsonBody<'a> {
    pub query: &'a str,
    pub variables: Option<&'a serde_json::Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        value: String,
    }

    #[test]
    fn envelope_with_data_only() {
        let env: Envelope<Item> = serde_json::from_str(r#"{"data":{"value":"x"}}"#).unwrap();
        assert_eq!(env.data, Some(Item { value: "x".into() }));
        assert!(env.errors.is_none());
    }

    #[test]
    fn envelope_keys_may_be_absent_or_null() {
        let env: Envelope<Item> = serde_json::from_str("{}").unwrap();
        assert!(env.data.is_none());
        assert!(env.errors.is_none());

        let env: Envelope<Item> = serde_json::from_str(r#"{"data":null,"errors":null}"#).unwrap();
        assert!(env.data.is_none());
        assert!(env.errors.is_none());
    }

    #[test]
    fn error_entry_keeps_optional_fields() {
        let raw = r#"{"errors":[{"message":"bad","locations":[{"line":1,"column":3}],"path":["a",0],"extensions":{"code":"X"}}]}"#;
        let env: Envelope<Item> = serde_json::from_str(raw).unwrap();
        let errors = env.errors.unwrap();
        assert_eq!(errors[0].message, "bad");
        assert_eq!(errors[0].locations, Some(vec![Location { line: 1, column: 3 }]));
        assert_eq!(errors[0].path, Some(vec![Value::from("a"), Value::from(0)]));
        assert_eq!(errors[0].extensions.as_ref().unwrap()["code"], "X");
    }

    #[test]
    fn error_entry_requires_message() {
        let result: Result<Envelope<Item>, _> = serde_json::from_str(r#"{"errors":[{}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn json_body_serializes_null_variables() {
        let body = JsonBody {
            query: "query {}",
            variables: None,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"query":"query {}","variables":null}"#
        );
    }
}
