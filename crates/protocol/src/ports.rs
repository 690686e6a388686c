//! Port traits implemented by infrastructure crates.
//!
//! [`RpcCaller`] is anything that can carry a remote call to a DIM server;
//! the pagination helper is written against it so it can run over HTTP in
//! production and over an in-memory fake in tests. [`CredentialSource`]
//! supplies a username and password when no stored session is usable.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::CallArgs;

/// Issues one remote call and returns its `result` value.
#[async_trait]
pub trait RpcCaller: Send + Sync {
    /// Failure type of the underlying transport.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Calls `method` with `args`. Exactly one round trip; never retried.
    async fn call(&self, method: &str, args: CallArgs) -> Result<Value, Self::Error>;
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Credentials could not be obtained from a [`CredentialSource`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not read {field}: {reason}")]
pub struct CredentialError {
    /// `"username"` or `"password"`.
    pub field: &'static str,
    /// Why the source failed (closed terminal, no value configured, ...).
    pub reason: String,
}

/// Supplies credentials that were not passed in programmatically.
///
/// The interactive implementation echoes the username and hides the password.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Returns the username to log in with.
    async fn username(&self) -> Result<String, CredentialError>;

    /// Returns the password for `username`.
    async fn password(&self, username: &str) -> Result<String, CredentialError>;
}

/// A [`CredentialSource`] that never prompts.
///
/// Useful for unattended scripts: any credential that was not supplied up
/// front is reported as missing.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    username: Option<String>,
    password: Option<String>,
}

impl StaticCredentials {
    /// Creates a source answering with the given values.
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self { username, password }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn username(&self) -> Result<String, CredentialError> {
        self.username.clone().ok_or(CredentialError {
            field: "username",
            reason: "no username configured".to_string(),
        })
    }

    async fn password(&self, _username: &str) -> Result<String, CredentialError> {
        self.password.clone().ok_or(CredentialError {
            field: "password",
            reason: "no password configured".to_string(),
        })
    }
}
