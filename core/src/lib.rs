//! Low-level GraphQL client over HTTP.
//!
//! # Overview
//! Builds a GraphQL POST from a [`Request`] (query, variables, files,
//! headers), sends it through a pluggable [`Transport`], and decodes the
//! `{"data", "errors"}` envelope into a caller-supplied value.
//!
//! ```no_run
//! use gql_client::{Client, Context, Request};
//! use std::time::Duration;
//!
//! // Safe to share across requests and threads.
//! let client = Client::new("https://example.com/graphql");
//!
//! let mut req = Request::new(
//!     "query ($key: String!) { items(id: $key) { field1 field2 } }",
//! );
//! req.var("key", "value");
//!
//! let mut resp = serde_json::Value::Null;
//! client.run(&Context::with_timeout(Duration::from_secs(5)), req, &mut resp)?;
//! # Ok::<(), gql_client::Error>(())
//! ```
//!
//! # Design
//! - Two encodings: a JSON body by default, `multipart/form-data` when the
//!   client is built with `multipart_form(true)`. Files need multipart mode.
//! - The transport sees plain `HttpRequest`/`HttpResponse` values, so the
//!   encoding and decoding logic is deterministic and testable without a
//!   network. [`UreqTransport`] is the default.
//! - Only the first server-reported error is surfaced as the error message.
//! - Debug lines go to an optional caller sink and to `tracing` at `debug`
//!   level under the `gql_client` target.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
mod multipart;
pub mod request;
pub mod types;

pub use client::{Client, LogFn};
pub use config::{ClientBuilder, ClientConfig, ConfigError};
pub use context::Context;
pub use error::{BoxError, Cancelled, Error, ServerErrors};
pub use http::{HttpRequest, HttpResponse, Transport, UreqTransport};
pub use request::{File, Request};
pub use types::{GraphQlError, Location};
pub use tokio_util::sync::CancellationToken;
