//! Shared value types for the DIM client domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! behaviour: the protocol version participates in the login handshake,
//! [`CallArgs`] folds named arguments into the positional parameter list, and
//! [`SessionPolicy`] selects how the session manager probes and logs in.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

/// Protocol version this client speaks.
///
/// The server's `protocol_version` method must return exactly this value or
/// login fails.
pub const PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion(17);

/// Integer protocol version advertised by a DIM server.
///
/// There is no compatibility range: two versions are compatible only when
/// they are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion(u64);

impl ProtocolVersion {
    /// Creates a [`ProtocolVersion`] from a raw integer.
    pub const fn new(version: u64) -> Self {
        Self(version)
    }

    /// Returns the underlying integer value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        PROTOCOL_VERSION
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Call arguments
// ---------------------------------------------------------------------------

/// Arguments for one remote call.
///
/// DIM methods take positional JSON-RPC parameters, conventionally ending in
/// an `options` mapping. Named arguments are a shorthand for that trailing
/// mapping: when any are present they are appended as one final positional
/// argument. Callers must not supply the same logical parameter both ways.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<Value>,
    named: Map<String, Value>,
}

impl CallArgs {
    /// Creates an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an argument list from positional values only.
    pub fn positional(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            named: Map::new(),
        }
    }

    /// Appends one positional argument.
    pub fn push(&mut self, value: impl Into<Value>) {
        self.positional.push(value.into());
    }

    /// Sets one named argument, replacing any earlier value for `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.named.insert(name.into(), value.into());
    }

    /// Builder form of [`CallArgs::push`].
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.push(value);
        self
    }

    /// Builder form of [`CallArgs::insert`].
    #[must_use]
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Merges every entry of `options` into the named arguments.
    #[must_use]
    pub fn with_options(mut self, options: Map<String, Value>) -> Self {
        self.named.extend(options);
        self
    }

    /// Returns `true` if there are neither positional nor named arguments.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Flattens into the JSON-RPC `params` list.
    pub fn into_params(self) -> Vec<Value> {
        let mut params = self.positional;
        if !self.named.is_empty() {
            params.push(Value::Object(self.named));
        }
        params
    }
}

// ---------------------------------------------------------------------------
// Session policy
// ---------------------------------------------------------------------------

/// Remote method used to ask the server which user owns the session.
pub const DEFAULT_WHOAMI_METHOD: &str = "whoami";

/// Knobs selecting how the session manager logs in and validates a session.
///
/// Different deployments of the client historically disagreed on these; one
/// policy struct replaces the diverging variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPolicy {
    /// Validate a stored session by also comparing the server-side username
    /// with the configured one, not only by probing the index page.
    pub verify_username: bool,

    /// `permanent_session` value used when a login does not specify one.
    pub permanent_session_default: bool,

    /// Drop any stored session cookie for this server before submitting
    /// credentials.
    pub purge_on_login: bool,

    /// Remote method returning the username of the current session.
    pub whoami_method: String,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            verify_username: false,
            permanent_session_default: false,
            purge_on_login: true,
            whoami_method: DEFAULT_WHOAMI_METHOD.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn named_arguments_become_one_trailing_mapping() {
        let args = CallArgs::new()
            .arg("10.0.0.0/8")
            .named("pool", "*")
            .named("limit", 2);

        assert_eq!(
            args.into_params(),
            vec![json!("10.0.0.0/8"), json!({"pool": "*", "limit": 2})]
        );
    }

    #[test]
    fn no_named_arguments_means_no_trailing_mapping() {
        let args = CallArgs::positional([json!(1), json!([2, 3])]);
        assert_eq!(args.into_params(), vec![json!(1), json!([2, 3])]);
        assert!(CallArgs::new().into_params().is_empty());
    }

    #[test]
    fn default_protocol_version_is_seventeen() {
        assert_eq!(ProtocolVersion::default().as_u64(), 17);
        assert_eq!(PROTOCOL_VERSION.to_string(), "17");
    }

    #[test]
    fn default_policy_purges_on_login_only() {
        let policy = SessionPolicy::default();
        assert!(policy.purge_on_login);
        assert!(!policy.verify_username);
        assert!(!policy.permanent_session_default);
        assert_eq!(policy.whoami_method, "whoami");
    }
}
