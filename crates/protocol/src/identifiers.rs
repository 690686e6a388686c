//! Newtype identifiers.
//!
//! A username and a remote method name are both strings on the wire, but they
//! are never interchangeable. Wrapping each in its own type keeps a
//! [`Username`] from being passed where a [`MethodName`] is expected.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// The DIM account name a session is authenticated as.
    ///
    /// Submitted to the login endpoint and compared against the server's
    /// "who am I" answer when username verification is enabled.
    Username
}

string_id! {
    /// Name of a remote JSON-RPC method (e.g. `"ip_list"`, `"protocol_version"`).
    ///
    /// The server's method catalogue is open-ended; any non-empty name is
    /// accepted and forwarded verbatim.
    MethodName
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_identifiers_are_rejected() {
        assert!(Username::new("").is_none());
        assert!(MethodName::new(String::new()).is_none());
    }

    #[test]
    fn identifiers_serialize_as_plain_strings() {
        let method = MethodName::new("ip_list").unwrap();
        assert_eq!(serde_json::to_value(&method).unwrap(), serde_json::json!("ip_list"));
        assert_eq!(method.to_string(), "ip_list");
    }
}
