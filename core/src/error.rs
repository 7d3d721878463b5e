//! Error types for the GraphQL client.
//!
//! # Design
//! Every failure `Client::run` can report is a variant of [`Error`]. Errors
//! that originate on the server (a non-200 status with an unreadable body, or
//! a decoded `errors` array) render with a `graphql: ` prefix so callers can
//! tell server provenance apart from local failures by message alone.

use std::fmt;

use thiserror::Error;

use crate::types::GraphQlError;

/// Boxed error used for causes that come from pluggable collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by `Client::run` and its encoding/decoding steps.
#[derive(Debug, Error)]
pub enum Error {
    /// The context was cancelled or its deadline passed, either before the
    /// call started or while the exchange was in flight.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// The request carries file attachments but the client is not in
    /// multipart form mode.
    #[error("graphql: cannot send files without multipart form mode")]
    FilesRequireMultipart,

    /// The outgoing body could not be built.
    #[error("{context}: {source}")]
    Encode {
        context: &'static str,
        #[source]
        source: BoxError,
    },

    /// The transport failed to complete the exchange. Rendered verbatim.
    #[error("{source}")]
    Transport {
        #[source]
        source: BoxError,
    },

    /// The body could not be decoded and the status was not 200.
    #[error("graphql: server returned a non-200 status code: {0}")]
    Status(u16),

    /// The body of a 200 response could not be decoded as an envelope.
    #[error("decoding response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The envelope decoded with a non-empty `errors` array.
    #[error("graphql: {}", .0.first().message)]
    Server(ServerErrors),
}

impl Error {
    pub(crate) fn encode(context: &'static str, source: impl Into<BoxError>) -> Self {
        Error::Encode {
            context,
            source: source.into(),
        }
    }

    /// Wrap any transport-level failure.
    pub fn transport(source: impl Into<BoxError>) -> Self {
        Error::Transport {
            source: source.into(),
        }
    }

    /// The HTTP status carried by a [`Error::Status`] error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status(code) => Some(*code),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }
}

/// Why a [`Context`](crate::Context) is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Cancelled {
    #[error("context canceled")]
    Canceled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// The `errors` array of an envelope. Guaranteed non-empty.
///
/// Only the first entry drives the error message; the rest stay reachable
/// through [`ServerErrors::all`].
#[derive(Debug, Clone, PartialEq)]
pub struct ServerErrors {
    errors: Vec<GraphQlError>,
}

impl ServerErrors {
    /// Returns `None` for an empty list.
    pub(crate) fn new(errors: Vec<GraphQlError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    /// The first error reported by the server.
    pub fn first(&self) -> &GraphQlError {
        &self.errors[0]
    }

    /// Every error reported by the server, in envelope order.
    pub fn all(&self) -> &[GraphQlError] {
        &self.errors
    }
}

impl fmt::Display for ServerErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graphql: {}", self.first().message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gql_error(message: &str) -> GraphQlError {
        GraphQlError {
            message: message.to_string(),
            ..GraphQlError::default()
        }
    }

    #[test]
    fn server_error_uses_first_message() {
        let errors = ServerErrors::new(vec![gql_error("bad"), gql_error("worse")]).unwrap();
        let err = Error::Server(errors);
        assert_eq!(err.to_string(), "graphql: bad");
        if let Error::Server(errors) = &err {
            assert_eq!(errors.all().len(), 2);
        }
    }

    #[test]
    fn empty_error_list_is_not_a_server_error() {
        assert!(ServerErrors::new(Vec::new()).is_none());
    }

    #[test]
    fn status_error_message_carries_code() {
        let err = Error::Status(500);
        assert_eq!(
            err.to_string(),
            "graphql: server returned a non-200 status code: 500"
        );
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn cancellation_messages() {
        assert_eq!(Error::from(Cancelled::Canceled).to_string(), "context canceled");
        assert_eq!(
            Error::from(Cancelled::DeadlineExceeded).to_string(),
            "context deadline exceeded"
        );
        assert!(Error::from(Cancelled::Canceled).is_cancelled());
    }

    #[test]
    fn transport_error_is_verbatim() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        assert_eq!(Error::transport(io).to_string(), "connection refused");
    }

    #[test]
    fn encode_error_prefixes_context() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        assert_eq!(
            Error::encode("preparing file", io).to_string(),
            "preparing file: disk gone"
        );
    }
}
