//! Error values defined by the DIM protocol.
//!
//! [`RpcError`] is what a server reports through the JSON-RPC `error` object.
//! [`ProtocolError`] is detected on the client side during the login
//! handshake and never arrives over the error channel. Transport failures are
//! an infrastructure concern and are defined in the `dimclient` crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ProtocolVersion;

/// Code carried by errors that originate in the client rather than the server.
pub const CLIENT_ERROR_CODE: i64 = 1;

// ---------------------------------------------------------------------------
// Server-reported errors
// ---------------------------------------------------------------------------

/// A failure reported by the server for a remote call.
///
/// `code` is the server's numeric error code; callers branch on it to tell
/// apart e.g. "not found" from "permission denied". The display form is the
/// bare message so it can be shown to a user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct RpcError {
    /// Human-readable message supplied by the server.
    pub message: String,
    /// Numeric error code supplied by the server.
    pub code: i64,
}

impl RpcError {
    /// Creates a new [`RpcError`].
    pub fn new(message: impl Into<String>, code: i64) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

// ---------------------------------------------------------------------------
// Handshake errors
// ---------------------------------------------------------------------------

/// The server cannot be talked to with this client's protocol.
///
/// Produced only by the protocol-version check that runs on every successful
/// login. Either variant makes the login attempt fail.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ProtocolError {
    /// The `protocol_version` call itself could not be completed, which means
    /// the server offers no usable JSON-RPC interface.
    #[error("The server does not have the JSONRPC interface enabled ({detail})")]
    InterfaceMissing {
        /// Text of the underlying failure.
        detail: String,
    },

    /// The server answered with a different protocol version.
    #[error(
        "Server protocol version ({server}) does not match client protocol version ({client})"
    )]
    VersionMismatch {
        /// What the server returned, rendered as text (it may not even be an integer).
        server: String,
        /// The version compiled into this client.
        client: ProtocolVersion,
    },
}

impl ProtocolError {
    /// Numeric code for this error; always [`CLIENT_ERROR_CODE`].
    pub fn code(&self) -> i64 {
        CLIENT_ERROR_CODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_error_displays_bare_message() {
        let err = RpcError::new("not found", 3);
        assert_eq!(err.to_string(), "not found");
        assert_eq!(err.code, 3);
    }

    #[test]
    fn version_mismatch_names_both_versions() {
        let err = ProtocolError::VersionMismatch {
            server: "16".to_string(),
            client: ProtocolVersion::new(17),
        };
        assert_eq!(
            err.to_string(),
            "Server protocol version (16) does not match client protocol version (17)"
        );
        assert_eq!(err.code(), CLIENT_ERROR_CODE);
    }

    #[test]
    fn interface_missing_carries_cause() {
        let err = ProtocolError::InterfaceMissing {
            detail: "HTTP 404 Not Found".to_string(),
        };
        assert!(err.to_string().contains("HTTP 404 Not Found"));
    }
}
