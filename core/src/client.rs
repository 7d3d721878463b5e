//! GraphQL request executor.
//!
//! # Design
//! `Client` holds an endpoint, a transport, the multipart flag and a log
//! sink, and carries no mutable state between calls. A call is split the
//! same way as the transport seam: `build_*_request` turns a [`Request`]
//! into an `HttpRequest`, the transport performs the round trip, and
//! `parse_response` maps the buffered body onto the caller's type. `run`
//! glues the three together and adds the context and mode checks.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{Map, Value};

use crate::config::ClientBuilder;
use crate::context::Context;
use crate::error::{Error, ServerErrors};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::multipart;
use crate::request::{Request, RequestParts};
use crate::types::{Envelope, JsonBody};

/// Debug log sink. Receives one pre-formatted line per call.
pub type LogFn = Arc<dyn Fn(&str) + Send + Sync>;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// A client for a GraphQL endpoint. Safe to share across threads and
/// requests; clones share the same transport.
///
/// ```no_run
/// use gql_client::{Client, Context, Request};
/// use serde::Deserialize;
///
/// #[derive(Default, Deserialize)]
/// struct Items {
///     items: Vec<String>,
/// }
///
/// let client = Client::new("https://example.com/graphql");
/// let mut req = Request::new("query ($key: String!) { items(id: $key) }");
/// req.var("key", "value");
///
/// let mut resp = Items::default();
/// client.run(&Context::background(), req, &mut resp)?;
/// # Ok::<(), gql_client::Error>(())
/// ```
#[derive(Clone)]
pub struct Client {
    endpoint: String,
    transport: Arc<dyn Transport>,
    use_multipart_form: bool,
    log: LogFn,
}

impl Client {
    /// A JSON-mode client with its own `ureq` transport and no logging.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::builder(endpoint).build()
    }

    pub fn builder(endpoint: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(endpoint)
    }

    pub(crate) fn from_parts(
        endpoint: String,
        transport: Arc<dyn Transport>,
        use_multipart_form: bool,
        log: LogFn,
    ) -> Self {
        Self {
            endpoint,
            transport,
            use_multipart_form,
            log,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn uses_multipart_form(&self) -> bool {
        self.use_multipart_form
    }

    /// Execute `req` and decode the response's `data` into `resp`.
    ///
    /// On error `resp` may or may not have been written. When the server
    /// reports errors, the first one is returned; the full list is reachable
    /// through [`Error::Server`]. A missing or `null` `data` leaves `resp`
    /// untouched.
    pub fn run<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        req: Request,
        resp: &mut T,
    ) -> Result<(), Error> {
        if let Some(data) = self.execute::<T>(ctx, req)? {
            *resp = data;
        }
        Ok(())
    }

    /// Execute `req`, checking only for errors. Any `data` is skipped.
    pub fn run_discarding(&self, ctx: &Context, req: Request) -> Result<(), Error> {
        self.execute::<IgnoredAny>(ctx, req).map(|_| ())
    }

    fn execute<T: DeserializeOwned>(&self, ctx: &Context, req: Request) -> Result<Option<T>, Error> {
        if let Some(reason) = ctx.err() {
            return Err(reason.into());
        }
        let request = if self.use_multipart_form {
            self.build_multipart_request(req)?
        } else {
            self.build_json_request(req)?
        };

        let response = self.transport.round_trip(ctx, request)?;
        self.logf(format_args!("<< {}", String::from_utf8_lossy(&response.body)));
        self.parse_response(&response)
    }

    /// Encode `req` as a JSON POST. Fails if `req` carries files.
    pub fn build_json_request(&self, req: Request) -> Result<HttpRequest, Error> {
        if !req.files().is_empty() {
            return Err(Error::FilesRequireMultipart);
        }
        let RequestParts {
            query,
            vars,
            headers: extra,
            ..
        } = req.into_parts();

        let body = serde_json::to_vec(&JsonBody {
            query: &query,
            variables: vars.as_ref(),
        })
        .map_err(|e| Error::encode("encode body", e))?;
        self.logf(format_args!(">> variables: {}", render_vars(vars.as_ref())));
        self.logf(format_args!(">> query: {query}"));

        let headers = self.outgoing_headers(JSON_CONTENT_TYPE.to_string(), extra);
        Ok(HttpRequest {
            url: self.endpoint.clone(),
            headers,
            body,
        })
    }

    /// Encode `req` as a `multipart/form-data` POST: a `query` field, a
    /// `variables` field when any were set, then one part per file.
    pub fn build_multipart_request(&self, req: Request) -> Result<HttpRequest, Error> {
        let RequestParts {
            query,
            vars,
            files,
            headers: extra,
        } = req.into_parts();

        let variables = vars
            .filter(|vars| !vars.is_empty())
            .map(|vars| serde_json::to_string(&vars))
            .transpose()
            .map_err(|e| Error::encode("encode variables", e))?;

        let file_count = files.len();
        let form = multipart::encode(&query, variables.as_deref(), files)?;

        self.logf(format_args!(
            ">> variables: {}",
            variables.as_deref().unwrap_or_default()
        ));
        self.logf(format_args!(">> files: {file_count}"));
        self.logf(format_args!(">> query: {query}"));

        let headers = self.outgoing_headers(form.content_type, extra);
        Ok(HttpRequest {
            url: self.endpoint.clone(),
            headers,
            body: form.body,
        })
    }

    /// Decode a buffered response.
    ///
    /// An undecodable body is blamed on the status when it is not 200, and
    /// on the body otherwise. A decoded `errors` array wins over `data`.
    pub fn parse_response<T: DeserializeOwned>(
        &self,
        response: &HttpResponse,
    ) -> Result<Option<T>, Error> {
        let envelope: Envelope<T> = match serde_json::from_slice(&response.body) {
            Ok(envelope) => envelope,
            Err(_) if response.status != 200 => return Err(Error::Status(response.status)),
            Err(e) => return Err(Error::Decode(e)),
        };
        if let Some(errors) = envelope.errors.and_then(ServerErrors::new) {
            return Err(Error::Server(errors));
        }
        Ok(envelope.data)
    }

    fn outgoing_headers(
        &self,
        content_type: String,
        extra: Vec<(String, String)>,
    ) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Content-Type".to_string(), content_type),
            ("Accept".to_string(), JSON_CONTENT_TYPE.to_string()),
        ];
        headers.extend(extra);
        self.logf(format_args!(">> headers: {headers:?}"));
        headers
    }

    fn logf(&self, args: fmt::Arguments<'_>) {
        let line = args.to_string();
        tracing::debug!(target: "gql_client", "{line}");
        let log = &self.log;
        if panic::catch_unwind(AssertUnwindSafe(|| log(&line))).is_err() {
            tracing::warn!(target: "gql_client", "log sink panicked; line dropped");
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("use_multipart_form", &self.use_multipart_form)
            .finish_non_exhaustive()
    }
}

fn render_vars(vars: Option<&Map<String, Value>>) -> String {
    serde_json::to_string(&vars).unwrap_or_default()
}
