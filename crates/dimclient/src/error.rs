//! Error type for every fallible [`crate::DimClient`] operation.
//!
//! Server-reported and handshake failures are the `protocol` crate's
//! [`RpcError`] and [`ProtocolError`]; this type adds the transport layer on
//! top. Nothing here is retried automatically.

use std::path::PathBuf;

use protocol::{
    CredentialError, EnvelopeError, PaginationError, ProtocolError, RpcError, CLIENT_ERROR_CODE,
};
use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by [`crate::DimClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced an HTTP response (connection refused, TLS,
    /// body read failure, ...).
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Endpoint that was being called.
        url: String,
        /// Underlying transport failure.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success HTTP status.
    ///
    /// `403` from the logged-in probe is not reported this way; it means
    /// "not logged in".
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Status returned by the server.
        status: StatusCode,
        /// Endpoint that was being called.
        url: String,
    },

    /// The protocol-version handshake failed during login.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The server returned a JSON-RPC `error` object.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The body was JSON but not a JSON-RPC response envelope.
    #[error(transparent)]
    MalformedResponse(#[from] EnvelopeError),

    /// The body was not valid JSON.
    #[error("response from {url} is not valid JSON: {source}")]
    Json {
        /// Endpoint that was being called.
        url: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// A paged listing returned data that cannot be paged further.
    #[error("{0}")]
    Listing(String),

    /// The configured server URL is unusable.
    #[error("invalid server URL `{url}`: {reason}")]
    InvalidUrl {
        /// The URL as configured.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Credentials could not be obtained.
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    /// The cookie file could not be written.
    #[error("failed to save cookies to {path}: {source}")]
    CookieSave {
        /// The configured cookie file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// DIM error code: the server's code for [`ClientError::Rpc`],
    /// [`CLIENT_ERROR_CODE`] for everything raised on the client side.
    pub fn code(&self) -> i64 {
        match self {
            Self::Rpc(err) => err.code,
            Self::Protocol(err) => err.code(),
            _ => CLIENT_ERROR_CODE,
        }
    }

    /// Returns the HTTP status if this is a [`ClientError::HttpStatus`].
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<PaginationError<ClientError>> for ClientError {
    fn from(err: PaginationError<ClientError>) -> Self {
        match err {
            PaginationError::Call(inner) => inner,
            other => Self::Listing(other.to_string()),
        }
    }
}
