//! Verify request encoding and response decoding against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Request bodies are compared as parsed JSON unless a vector pins the exact
//! `raw_body`, so key order only matters where it is part of the contract.

use gql_client::{Client, Error, HttpResponse, Request};
use serde_json::Value;

fn header_pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// JSON request encoding
// ---------------------------------------------------------------------------

#[test]
fn json_request_test_vectors() {
    let raw = include_str!("../../test-vectors/json_request.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let endpoint = vectors["endpoint"].as_str().unwrap();
    let client = Client::new(endpoint);
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let mut req = Request::new(case["query"].as_str().unwrap());
        if let Some(vars) = case.get("variables").and_then(Value::as_object) {
            for (key, value) in vars {
                req.var(key.as_str(), value.clone());
            }
        }
        if let Some(headers) = case.get("headers") {
            for (key, value) in header_pairs(headers) {
                req.header(key, value);
            }
        }

        let built = client.build_json_request(req).unwrap();
        let expected = &case["expected_request"];
        assert_eq!(built.url, endpoint, "{name}: url");
        assert_eq!(built.headers, header_pairs(&expected["headers"]), "{name}: headers");

        if let Some(raw_body) = expected.get("raw_body") {
            assert_eq!(
                String::from_utf8(built.body).unwrap(),
                raw_body.as_str().unwrap(),
                "{name}: raw body"
            );
        } else {
            let body: Value = serde_json::from_slice(&built.body).unwrap();
            assert_eq!(body, expected["body"], "{name}: body");
        }
    }
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let client = Client::new("http://localhost:4000/graphql");
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let response = HttpResponse {
            status: case["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: case["body"].as_str().unwrap().as_bytes().to_vec(),
        };
        let result = client.parse_response::<Value>(&response);

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            match expected_error["kind"].as_str().unwrap() {
                "server" => assert!(matches!(err, Error::Server(_)), "{name}: expected Server"),
                "status" => assert_eq!(err.status(), Some(response.status), "{name}: expected Status"),
                "decode" => assert!(matches!(err, Error::Decode(_)), "{name}: expected Decode"),
                other => panic!("{name}: unknown expected_error kind: {other}"),
            }
            if let Some(message) = expected_error.get("message") {
                assert_eq!(err.to_string(), message.as_str().unwrap(), "{name}: message");
            }
        } else {
            let data = result.unwrap();
            let expected = &case["expected_result"];
            if expected.is_null() {
                assert!(data.is_none(), "{name}: expected no data");
            } else {
                assert_eq!(data.as_ref(), Some(expected), "{name}: parsed result");
            }
        }
    }
}
