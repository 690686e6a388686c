//! Remote call dispatch.
//!
//! [`DimClient::raw_call`] performs exactly one JSON-RPC round trip.
//! [`DimClient::call`] adds named-argument folding, and
//! [`DimClient::method`] gives any remote method a call syntax without a
//! per-method binding. The handful of methods the client itself relies on
//! get typed wrappers at the bottom.

use std::time::Instant;

use async_trait::async_trait;
use protocol::{list_all, CallArgs, PageQuery, RpcCaller, RpcRequest, RpcResponse};
use serde_json::{Map, Value};
use tracing::{debug, enabled, Level};

use crate::{ClientError, DimClient};

/// Path of the JSON-RPC endpoint below the server URL.
pub const RPC_PATH: &str = "/jsonrpc";

const PROTOCOL_VERSION_METHOD: &str = "protocol_version";
const IP_LIST_METHOD: &str = "ip_list";
const IP_LIST_CURSOR: &str = "ip";

impl DimClient {
    /// Calls `method` with positional `params` and returns its `result`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Transport`] / [`ClientError::HttpStatus`] when the
    ///   HTTP exchange fails.
    /// - [`ClientError::Json`] / [`ClientError::MalformedResponse`] when the
    ///   body is not a JSON-RPC response.
    /// - [`ClientError::Rpc`] when the server returns an `error` object.
    pub async fn raw_call(&self, method: &str, params: Vec<Value>) -> Result<Value, ClientError> {
        let url = self.endpoint(RPC_PATH);
        let request = RpcRequest::new(method, params);
        if enabled!(Level::DEBUG) {
            let args: Vec<String> = request.params.iter().map(Value::to_string).collect();
            debug!("dim call: {}({})", method, args.join(", "));
        }

        let started = Instant::now();
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::HttpStatus { status, url });
        }
        let body = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        let body: Value =
            serde_json::from_slice(&body).map_err(|source| ClientError::Json { url, source })?;
        debug!("time taken: {:.3}", started.elapsed().as_secs_f64());

        match RpcResponse::from_value(body)? {
            RpcResponse::Result(result) => {
                if enabled!(Level::DEBUG) {
                    let pretty = serde_json::to_string_pretty(&result)
                        .unwrap_or_else(|_| result.to_string());
                    debug!("dim result: {pretty}");
                }
                Ok(result)
            }
            RpcResponse::Error(error) => {
                debug!(code = error.code, "dim error: {}", error.message);
                Err(error.into())
            }
        }
    }

    /// Calls `method` with `args`; named arguments travel as one trailing
    /// mapping after the positional ones.
    ///
    /// # Errors
    ///
    /// See [`DimClient::raw_call`].
    pub async fn call(&self, method: &str, args: CallArgs) -> Result<Value, ClientError> {
        self.raw_call(method, args.into_params()).await
    }

    /// Starts a call to an arbitrary remote method.
    ///
    /// ```no_run
    /// # async fn run(client: &dimclient::DimClient) -> Result<(), dimclient::ClientError> {
    /// let ips = client
    ///     .method("ip_list")
    ///     .named("pool", "*")
    ///     .named("type", "all")
    ///     .named("limit", 2)
    ///     .send()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn method(&self, name: impl Into<String>) -> MethodCall<'_> {
        MethodCall {
            client: self,
            method: name.into(),
            args: CallArgs::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Typed wrappers
    // -----------------------------------------------------------------------

    /// Protocol version advertised by the server.
    ///
    /// # Errors
    ///
    /// See [`DimClient::raw_call`].
    pub async fn protocol_version(&self) -> Result<Value, ClientError> {
        self.raw_call(PROTOCOL_VERSION_METHOD, Vec::new()).await
    }

    /// Username the server associates with the current session.
    ///
    /// # Errors
    ///
    /// See [`DimClient::raw_call`].
    pub async fn whoami(&self) -> Result<Value, ClientError> {
        self.raw_call(&self.policy.whoami_method, Vec::new()).await
    }

    /// One page of `ip_list` for the given options.
    ///
    /// # Errors
    ///
    /// See [`DimClient::raw_call`].
    pub async fn ip_list(&self, options: Map<String, Value>) -> Result<Value, ClientError> {
        self.call(IP_LIST_METHOD, CallArgs::new().with_options(options)).await
    }

    /// All `ip_list` items up to `options["limit"]` (default 10), paging on
    /// the `ip` field.
    ///
    /// # Errors
    ///
    /// See [`DimClient::list_all`].
    pub async fn ip_list_all(&self, options: Map<String, Value>) -> Result<Vec<Value>, ClientError> {
        self.list_all(&PageQuery::new(IP_LIST_METHOD, IP_LIST_CURSOR, options)).await
    }

    /// Collects the items of any keyset-paged listing method.
    ///
    /// # Errors
    ///
    /// Any call failure is returned as-is; a page that is not a list or lacks
    /// the cursor field yields [`ClientError::Listing`].
    pub async fn list_all(&self, query: &PageQuery) -> Result<Vec<Value>, ClientError> {
        Ok(list_all(self, query).await?)
    }
}

#[async_trait]
impl RpcCaller for DimClient {
    type Error = ClientError;

    async fn call(&self, method: &str, args: CallArgs) -> Result<Value, ClientError> {
        DimClient::call(self, method, args).await
    }
}

// ---------------------------------------------------------------------------
// Method call builder
// ---------------------------------------------------------------------------

/// A pending call to a remote method, built with [`DimClient::method`].
///
/// The method name is forwarded verbatim; the builder never intercepts names
/// of the client's own operations.
#[derive(Debug)]
#[must_use = "a method call does nothing until `send` is awaited"]
pub struct MethodCall<'a> {
    client: &'a DimClient,
    method: String,
    args: CallArgs,
}

impl MethodCall<'_> {
    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value);
        self
    }

    /// Sets a named argument.
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(name, value);
        self
    }

    /// Sets every entry of `options` as a named argument.
    pub fn options(mut self, options: Map<String, Value>) -> Self {
        self.args = self.args.with_options(options);
        self
    }

    /// Sends the call.
    ///
    /// # Errors
    ///
    /// See [`DimClient::raw_call`].
    pub async fn send(self) -> Result<Value, ClientError> {
        self.client.call(&self.method, self.args).await
    }
}
