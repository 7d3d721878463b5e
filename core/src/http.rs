//! HTTP transport seam.
//!
//! # Design
//! Requests and responses cross the seam as plain data: the client builds an
//! `HttpRequest`, a [`Transport`] performs the exchange, and the client
//! parses the returned `HttpResponse`. Every GraphQL call is a single POST,
//! so the request carries no method. Bodies are owned bytes so multipart
//! uploads and JSON share one shape, and the response body is always fully
//! buffered before decoding.
//!
//! [`UreqTransport`] is the default implementation. Any other HTTP stack can
//! be plugged in by implementing [`Transport`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::context::Context;
use crate::error::Error;

/// An outgoing POST described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A buffered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Performs one request/response exchange.
///
/// Implementations must honor `ctx`: return [`Error::Cancelled`] when it is
/// done before or during the exchange. Non-2xx statuses are data, not errors.
/// Connection and I/O failures map to [`Error::Transport`].
pub trait Transport: Send + Sync {
    fn round_trip(&self, ctx: &Context, request: HttpRequest) -> Result<HttpResponse, Error>;
}

impl<F> Transport for F
where
    F: Fn(&Context, HttpRequest) -> Result<HttpResponse, Error> + Send + Sync,
{
    fn round_trip(&self, ctx: &Context, request: HttpRequest) -> Result<HttpResponse, Error> {
        self(ctx, request)
    }
}

// How often a waiting call re-checks its context.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Upper bound on a single exchange through the default agent. A request
/// whose context sets a deadline uses that deadline instead.
pub const FALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Default transport backed by a `ureq` agent.
///
/// The exchange runs on a worker thread so the calling thread can give up as
/// soon as the context is cancelled. An abandoned worker keeps running until
/// ureq gives up on its own: at the context deadline when there is one,
/// otherwise at the agent's global timeout ([`FALLBACK_TIMEOUT`] for the
/// default agent). [`UreqTransport::in_flight`] counts live workers.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    workers: Arc<AtomicUsize>,
}

impl UreqTransport {
    /// Use a caller-configured agent. The agent should be built with
    /// `http_status_as_error(false)`; otherwise non-2xx replies surface as
    /// transport errors instead of reaching envelope decoding. Without a
    /// global timeout on the agent, a cancelled call with no deadline may
    /// leave its worker waiting on the server indefinitely.
    pub fn new(agent: ureq::Agent) -> Self {
        Self {
            agent,
            workers: Arc::default(),
        }
    }

    /// Worker threads still running, including abandoned ones.
    pub fn in_flight(&self) -> usize {
        self.workers.load(Ordering::SeqCst)
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(FALLBACK_TIMEOUT))
            .build()
            .new_agent();
        Self::new(agent)
    }
}

// Decrements the live worker count when the worker exits, panicking or not.
struct WorkerGuard(Arc<AtomicUsize>);

impl WorkerGuard {
    fn enter(workers: &Arc<AtomicUsize>) -> Self {
        workers.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(workers))
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Transport for UreqTransport {
    fn round_trip(&self, ctx: &Context, request: HttpRequest) -> Result<HttpResponse, Error> {
        if let Some(reason) = ctx.err() {
            return Err(reason.into());
        }

        let agent = self.agent.clone();
        let timeout = ctx.remaining();
        let guard = WorkerGuard::enter(&self.workers);
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _guard = guard;
            // The receiver is gone if the caller was cancelled.
            let _ = tx.send(execute(&agent, request, timeout));
        });

        loop {
            if let Some(reason) = ctx.err() {
                tracing::debug!(target: "gql_client", %reason, "abandoning in-flight request");
                return Err(reason.into());
            }
            let wait = match ctx.remaining() {
                Some(left) => left.min(CANCEL_POLL_INTERVAL),
                None => CANCEL_POLL_INTERVAL,
            };
            match rx.recv_timeout(wait) {
                // ureq's own timeout is the context deadline, so a failure
                // that lands once the context is done is reported as such.
                Ok(Err(err)) => return Err(ctx.err().map_or(err, Error::from)),
                Ok(response) => return response,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::transport("transport worker exited without a response"))
                }
            }
        }
    }
}

fn execute(
    agent: &ureq::Agent,
    request: HttpRequest,
    timeout: Option<Duration>,
) -> Result<HttpResponse, Error> {
    let mut builder = agent.post(&request.url);
    if let Some(timeout) = timeout {
        builder = builder.config().timeout_global(Some(timeout)).build();
    }
    for (name, value) in &request.headers {
        builder = builder.header(name, value);
    }

    let mut response = builder.send(&request.body[..]).map_err(Error::transport)?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    // No size cap: the whole body is handed to the decoder.
    let body = response
        .body_mut()
        .with_config()
        .limit(u64::MAX)
        .read_to_vec()
        .map_err(|e| Error::transport(format!("reading body: {e}")))?;

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}
