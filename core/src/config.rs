//! Client construction.
//!
//! # Design
//! Everything that shapes a [`Client`] is fixed at construction time, either
//! through [`ClientBuilder`] or from a [`ClientConfig`] loaded from a config
//! file or the environment. The builder falls back to a [`UreqTransport`]
//! created for this client when no transport is supplied; there is no
//! process-wide default instance.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::{Client, LogFn};
use crate::http::{Transport, UreqTransport};

pub const ENDPOINT_VAR: &str = "GRAPHQL_ENDPOINT";
pub const MULTIPART_VAR: &str = "GRAPHQL_MULTIPART";
pub const TIMEOUT_VAR: &str = "GRAPHQL_TIMEOUT_MS";

/// Builder for [`Client`].
///
/// ```
/// use gql_client::Client;
///
/// let client = Client::builder("https://example.com/graphql")
///     .multipart_form(true)
///     .log(|line| eprintln!("{line}"))
///     .build();
/// assert!(client.uses_multipart_form());
/// ```
pub struct ClientBuilder {
    endpoint: String,
    transport: Option<Arc<dyn Transport>>,
    timeout: Option<Duration>,
    use_multipart_form: bool,
    log: Option<LogFn>,
}

impl ClientBuilder {
    pub(crate) fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport: None,
            timeout: None,
            use_multipart_form: false,
            log: None,
        }
    }

    /// Send requests through `transport` instead of a fresh `ureq` agent.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Send requests through a caller-configured `ureq` agent.
    pub fn http_client(self, agent: ureq::Agent) -> Self {
        self.transport(UreqTransport::new(agent))
    }

    /// Per-request timeout for the default transport. Ignored when a
    /// transport or agent is supplied.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Encode requests as `multipart/form-data`. Required for file uploads.
    pub fn multipart_form(mut self, enabled: bool) -> Self {
        self.use_multipart_form = enabled;
        self
    }

    /// Receive a line of debug output for every request and response.
    pub fn log(mut self, log: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.log = Some(Arc::new(log));
        self
    }

    pub fn build(self) -> Client {
        let transport = match (self.transport, self.timeout) {
            (Some(transport), _) => transport,
            (None, Some(timeout)) => {
                let agent = ureq::Agent::config_builder()
                    .http_status_as_error(false)
                    .timeout_global(Some(timeout))
                    .build()
                    .new_agent();
                Arc::new(UreqTransport::new(agent))
            }
            (None, None) => Arc::new(UreqTransport::default()),
        };
        let log: LogFn = match self.log {
            Some(log) => log,
            None => Arc::new(|_: &str| {}),
        };
        Client::from_parts(self.endpoint, transport, self.use_multipart_form, log)
    }
}

/// Serializable client settings.
///
/// ```
/// let config: gql_client::ClientConfig = serde_json::from_str(
///     r#"{"endpoint":"https://example.com/graphql","use_multipart_form":true}"#,
/// ).unwrap();
/// assert!(config.into_builder().build().uses_multipart_form());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub endpoint: String,
    #[serde(default)]
    pub use_multipart_form: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            use_multipart_form: false,
            timeout_ms: None,
        }
    }

    /// Read `GRAPHQL_ENDPOINT` (required), `GRAPHQL_MULTIPART` and
    /// `GRAPHQL_TIMEOUT_MS` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`ClientConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let endpoint = lookup(ENDPOINT_VAR)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing(ENDPOINT_VAR))?;

        let use_multipart_form = match lookup(MULTIPART_VAR) {
            None => false,
            Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                name: MULTIPART_VAR,
                value,
            })?,
        };

        let timeout_ms = match lookup(TIMEOUT_VAR) {
            None => None,
            Some(value) => Some(value.trim().parse().map_err(|_| ConfigError::Invalid {
                name: TIMEOUT_VAR,
                value,
            })?),
        };

        Ok(Self {
            endpoint,
            use_multipart_form,
            timeout_ms,
        })
    }

    pub fn into_builder(self) -> ClientBuilder {
        let builder = ClientBuilder::new(self.endpoint).multipart_form(self.use_multipart_form);
        match self.timeout_ms {
            Some(ms) => builder.timeout(Duration::from_millis(ms)),
            None => builder,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Errors loading a [`ClientConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
