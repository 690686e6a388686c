//! JSON-RPC 2.0 request and response envelopes.
//!
//! The client never pipelines calls, so the correlation `id` is always `null`.
//! A response carries either a `result` (any JSON value, including `null`) or
//! an `error` object with `message` and `code`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{RpcError, CLIENT_ERROR_CODE};

/// Value of the `jsonrpc` member of every request.
pub const JSONRPC_VERSION: &str = "2.0";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// One outgoing JSON-RPC call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Always [`JSONRPC_VERSION`].
    pub jsonrpc: String,
    /// Remote method name, forwarded verbatim.
    pub method: String,
    /// Positional parameters.
    pub params: Vec<Value>,
    /// Correlation id; always `null`.
    pub id: Option<Value>,
}

impl RpcRequest {
    /// Builds a request for `method` with the given positional parameters.
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// A decoded response envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcResponse {
    /// The call succeeded; the value is returned to the caller unchanged.
    Result(Value),
    /// The server reported a failure.
    Error(RpcError),
}

/// The response body is JSON but not a JSON-RPC response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed JSON-RPC response: {reason}")]
pub struct EnvelopeError {
    /// What was wrong with the envelope.
    pub reason: String,
}

impl EnvelopeError {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorObject {
    message: String,
    #[serde(default = "client_error_code")]
    code: i64,
}

fn client_error_code() -> i64 {
    CLIENT_ERROR_CODE
}

impl RpcResponse {
    /// Interprets a decoded JSON body as a response envelope.
    ///
    /// A non-null `error` member takes precedence over `result`. A `result`
    /// member that is present but `null` is a successful `null` result.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] when the body is not an object, when the
    /// error object lacks a string `message`, or when neither member exists.
    pub fn from_value(body: Value) -> Result<Self, EnvelopeError> {
        let mut members: Map<String, Value> = match body {
            Value::Object(map) => map,
            other => {
                return Err(EnvelopeError::new(format!(
                    "expected an object, got {other}"
                )))
            }
        };

        match members.remove("error") {
            Some(Value::Null) | None => {}
            Some(error) => {
                let error: ErrorObject = serde_json::from_value(error)
                    .map_err(|e| EnvelopeError::new(format!("invalid error object: {e}")))?;
                return Ok(Self::Error(RpcError::new(error.message, error.code)));
            }
        }

        members
            .remove("result")
            .map(Self::Result)
            .ok_or_else(|| EnvelopeError::new("neither `result` nor `error` present"))
    }

    /// Converts into a `Result`, turning a server error into `Err`.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self {
            Self::Result(value) => Ok(value),
            Self::Error(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_with_null_id() {
        let request = RpcRequest::new("ip_list", vec![json!({"pool": "*"})]);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"jsonrpc": "2.0", "method": "ip_list", "params": [{"pool": "*"}], "id": null})
        );
    }

    #[test]
    fn error_member_becomes_rpc_error() {
        let response =
            RpcResponse::from_value(json!({"error": {"message": "not found", "code": 3}})).unwrap();
        let err = response.into_result().unwrap_err();
        assert_eq!(err.message, "not found");
        assert_eq!(err.code, 3);
    }

    #[test]
    fn null_result_is_a_result() {
        let response = RpcResponse::from_value(json!({"result": null, "id": null})).unwrap();
        assert_eq!(response, RpcResponse::Result(Value::Null));
    }

    #[test]
    fn null_error_is_ignored() {
        let response = RpcResponse::from_value(json!({"result": [1], "error": null})).unwrap();
        assert_eq!(response.into_result().unwrap(), json!([1]));
    }

    #[test]
    fn error_without_code_uses_client_code() {
        let response = RpcResponse::from_value(json!({"error": {"message": "boom"}})).unwrap();
        assert_eq!(response.into_result().unwrap_err().code, CLIENT_ERROR_CODE);
    }

    #[test]
    fn envelope_without_members_is_malformed() {
        assert!(RpcResponse::from_value(json!({"id": null})).is_err());
        assert!(RpcResponse::from_value(json!([1, 2])).is_err());
        assert!(RpcResponse::from_value(json!({"error": "text"})).is_err());
    }
}
