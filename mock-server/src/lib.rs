//! A recording GraphQL endpoint for tests.
//!
//! Every POST to `/graphql` is captured (headers plus the decoded JSON or
//! multipart body) and answered either by echoing the operation back as
//! `data` or with a scripted reply. `GET /requests` lists what was captured.

use std::{sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub use axum::http::StatusCode as Status;

/// One request as the server saw it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recorded {
    pub headers: Vec<(String, String)>,
    pub body: Received,
}

impl Recorded {
    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Every value of a header, in arrival order.
    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Received {
    /// A JSON body. `raw` is the exact text sent.
    Json { raw: String, body: Value },
    /// A `multipart/form-data` body, parts in order.
    Multipart { parts: Vec<FormPart> },
    /// A body that was neither valid JSON nor valid multipart.
    Invalid { raw: String, reason: String },
}

impl Received {
    pub fn part(&self, name: &str) -> Option<&FormPart> {
        match self {
            Received::Multipart { parts } => parts.iter().find(|part| part.name == name),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub data: Vec<u8>,
}

impl FormPart {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// A canned answer.
#[derive(Clone, Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Hold the reply back for `delay`.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub enum Responder {
    /// Answer with `{"data": {"query": ..., "variables": ..., "files": [...]}}`.
    #[default]
    Echo,
    Fixed(Reply),
}

#[derive(Clone, Default)]
pub struct MockState {
    responder: Arc<Responder>,
    recorded: Arc<RwLock<Vec<Recorded>>>,
}

impl MockState {
    pub fn new(responder: Responder) -> Self {
        Self {
            responder: Arc::new(responder),
            recorded: Arc::default(),
        }
    }

    pub fn replying(reply: Reply) -> Self {
        Self::new(Responder::Fixed(reply))
    }

    pub async fn requests(&self) -> Vec<Recorded> {
        self.recorded.read().await.clone()
    }

    /// Like [`MockState::requests`] for synchronous callers. Panics when
    /// called from inside an async runtime.
    pub fn blocking_requests(&self) -> Vec<Recorded> {
        self.recorded.blocking_read().clone()
    }
}

pub fn app() -> Router {
    app_with(MockState::default())
}

pub fn app_with(state: MockState) -> Router {
    Router::new()
        .route("/graphql", post(graphql))
        .route("/requests", get(list_requests))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: MockState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(state)).await
}

async fn list_requests(State(state): State<MockState>) -> Json<Vec<Recorded>> {
    Json(state.requests().await)
}

async fn graphql(State(state): State<MockState>, request: Request) -> Response {
    let headers = collect_headers(request.headers());
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    let body = if is_multipart {
        read_multipart(request, &state).await
    } else {
        read_json(request, &state).await
    };
    tracing::info!(headers = headers.len(), body = ?body, "graphql request");

    let reply = match state.responder.as_ref() {
        Responder::Echo => Reply::ok(echo(&body).to_string()),
        Responder::Fixed(reply) => reply.clone(),
    };
    state.recorded.write().await.push(Recorded { headers, body });

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    (
        reply.status,
        [(header::CONTENT_TYPE, "application/json")],
        reply.body,
    )
        .into_response()
}

fn collect_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

async fn read_json(request: Request, state: &MockState) -> Received {
    let bytes = match Bytes::from_request(request, state).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return Received::Invalid {
                raw: String::new(),
                reason: e.body_text(),
            }
        }
    };
    let raw = String::from_utf8_lossy(&bytes).into_owned();
    match serde_json::from_slice(&bytes) {
        Ok(body) => Received::Json { raw, body },
        Err(e) => Received::Invalid {
            raw,
            reason: e.to_string(),
        },
    }
}

async fn read_multipart(request: Request, state: &MockState) -> Received {
    let mut multipart = match Multipart::from_request(request, state).await {
        Ok(multipart) => multipart,
        Err(e) => {
            return Received::Invalid {
                raw: String::new(),
                reason: e.body_text(),
            }
        }
    };

    let mut parts = Vec::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field.name().unwrap_or_default().to_string();
                let file_name = field.file_name().map(str::to_string);
                match field.bytes().await {
                    Ok(data) => parts.push(FormPart {
                        name,
                        file_name,
                        data: data.to_vec(),
                    }),
                    Err(e) => {
                        return Received::Invalid {
                            raw: String::new(),
                            reason: e.body_text(),
                        }
                    }
                }
            }
            Ok(None) => return Received::Multipart { parts },
            Err(e) => {
                return Received::Invalid {
                    raw: String::new(),
                    reason: e.body_text(),
                }
            }
        }
    }
}

fn echo(body: &Received) -> Value {
    match body {
        Received::Json { body, .. } => json!({
            "data": {
                "query": body.get("query").cloned().unwrap_or(Value::Null),
                "variables": body.get("variables").cloned().unwrap_or(Value::Null),
                "files": [],
            }
        }),
        Received::Multipart { parts } => {
            let query = body.part("query").map(FormPart::text);
            let variables = body
                .part("variables")
                .and_then(|part| serde_json::from_slice::<Value>(&part.data).ok())
                .unwrap_or(Value::Null);
            let files: Vec<Value> = parts
                .iter()
                .filter(|part| part.file_name.is_some())
                .map(|part| {
                    json!({
                        "field": part.name,
                        "file_name": part.file_name,
                        "content": part.text(),
                    })
                })
                .collect();
            json!({
                "data": { "query": query, "variables": variables, "files": files }
            })
        }
        Received::Invalid { reason, .. } => json!({
            "errors": [{ "message": format!("invalid request body: {reason}") }]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_json_reflects_query_and_variables() {
        let body = Received::Json {
            raw: String::new(),
            body: json!({"query": "query {}", "variables": {"a": 1}}),
        };
        assert_eq!(
            echo(&body),
            json!({"data": {"query": "query {}", "variables": {"a": 1}, "files": []}})
        );
    }

    #[test]
    fn echo_multipart_lists_files() {
        let body = Received::Multipart {
            parts: vec![
                FormPart {
                    name: "query".to_string(),
                    file_name: None,
                    data: b"query {}".to_vec(),
                },
                FormPart {
                    name: "file".to_string(),
                    file_name: Some("filename.txt".to_string()),
                    data: b"This is a file".to_vec(),
                },
            ],
        };
        let echoed = echo(&body);
        assert_eq!(echoed["data"]["query"], "query {}");
        assert_eq!(echoed["data"]["variables"], Value::Null);
        assert_eq!(echoed["data"]["files"][0]["file_name"], "filename.txt");
        assert_eq!(echoed["data"]["files"][0]["content"], "This is a file");
    }

    #[test]
    fn echo_invalid_body_is_graphql_error() {
        let body = Received::Invalid {
            raw: "nope".to_string(),
            reason: "expected value".to_string(),
        };
        assert_eq!(
            echo(&body)["errors"][0]["message"],
            "invalid request body: expected value"
        );
    }

    #[test]
    fn recorded_header_lookup_ignores_case() {
        let recorded = Recorded {
            headers: vec![
                ("x-custom-header".to_string(), "1".to_string()),
                ("X-Custom-Header".to_string(), "2".to_string()),
            ],
            body: Received::Multipart { parts: Vec::new() },
        };
        assert_eq!(recorded.header("X-CUSTOM-HEADER"), Some("1"));
        assert_eq!(recorded.header_all("x-custom-header"), vec!["1", "2"]);
    }

    #[test]
    fn reply_defaults_to_no_delay() {
        let reply = Reply::ok("{}");
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.delay.is_zero());
        assert_eq!(reply.delayed(Duration::from_millis(5)).delay, Duration::from_millis(5));
    }
}
