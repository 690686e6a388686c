//! DIM JSON-RPC client.
//!
//! Talks to a DIM (DNS and IP management) server over HTTP: logs in through
//! the web session endpoint, keeps the session cookie in a cookie file across
//! process runs, checks the protocol version, and forwards any remote call to
//! the `/jsonrpc` endpoint.
//!
//! ```no_run
//! use dimclient::{script_client, ClientError};
//!
//! # async fn run() -> Result<(), ClientError> {
//! let client = script_client("http://localhost:5000", None, None).await?;
//! let ips = client
//!     .method("ip_list")
//!     .named("pool", "*")
//!     .named("type", "all")
//!     .named("limit", 2)
//!     .send()
//!     .await?;
//! println!("{ips}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, cookie persistence, and the session
//! state machine live here. Envelope types, error values, and pagination come
//! from the [`protocol`] crate.
//!
//! ## Concurrency
//!
//! One client owns one session and issues one request at a time. It is not
//! meant to be shared between tasks without external synchronization.

pub mod config;
pub mod cookies;
mod error;
mod negotiate;
pub mod prompt;
pub mod rpc;
pub mod session;

pub use config::{default_cookie_file, ClientConfig};
pub use cookies::{CookieFile, CookieJar, SESSION_COOKIE};
pub use error::ClientError;
pub use prompt::TerminalCredentials;
pub use rpc::MethodCall;
pub use session::LoginOptions;

use protocol::{ProtocolVersion, SessionPolicy, Username};
use reqwest::Url;
use tracing::warn;

/// Client for one DIM server and one session.
#[derive(Debug)]
pub struct DimClient {
    /// Server URL without a trailing slash.
    base_url: String,
    /// Host the session cookie is scoped to.
    cookie_domain: String,
    /// Path the session cookie is scoped to.
    cookie_path: String,
    http: reqwest::Client,
    cookies: CookieJar,
    protocol: ProtocolVersion,
    username: Option<Username>,
    policy: SessionPolicy,
}

impl DimClient {
    /// Creates a client, loading stored cookies from the configured file.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidUrl`] when the server URL does not parse or is
    ///   not `http`/`https`.
    /// - [`ClientError::HttpClient`] when the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidUrl {
            url: config.server_url.clone(),
            reason,
        };
        let url = Url::parse(&config.server_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
        }
        let cookie_domain = url
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?
            .to_string();
        let cookie_path = match url.path().trim_end_matches('/') {
            "" => "/".to_string(),
            path => path.to_string(),
        };

        let cookies = CookieJar::new(config.cookie_file.map(|path| CookieFile {
            path,
            umask: config.cookie_umask,
            save_enabled: config.save_cookie,
        }));
        let http = reqwest::Client::builder()
            .cookie_provider(cookies.provider())
            .user_agent(concat!("dimclient/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::HttpClient)?;

        Ok(Self {
            base_url: config.server_url.trim_end_matches('/').to_string(),
            cookie_domain,
            cookie_path,
            http,
            cookies,
            protocol: config.protocol_version,
            username: config.username,
            policy: config.session_policy,
        })
    }

    /// Server URL as configured, without a trailing slash.
    pub fn server_url(&self) -> &str {
        &self.base_url
    }

    /// Username of the current session, or the configured one before login.
    pub fn username(&self) -> Option<&Username> {
        self.username.as_ref()
    }

    /// The session policy in effect.
    pub fn session_policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// The session's cookie jar.
    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Returns a client using `~/.ndcli.cookie` and a permanent session, logged
/// in through [`DimClient::login_prompt`] with terminal prompts for missing
/// credentials.
///
/// A rejected login is logged but still returns the client, so the first
/// remote call reports the authentication problem.
///
/// # Errors
///
/// Construction errors, probe failures, credential prompt failures, and
/// protocol-version mismatches.
pub async fn script_client(
    server_url: &str,
    username: Option<String>,
    password: Option<String>,
) -> Result<DimClient, ClientError> {
    let mut config = ClientConfig::new(server_url).session_policy(SessionPolicy {
        permanent_session_default: true,
        ..SessionPolicy::default()
    });
    if let Some(path) = default_cookie_file() {
        config = config.cookie_file(path);
    }

    let mut client = DimClient::new(config)?;
    let options = LoginOptions {
        username,
        password,
        ..LoginOptions::default()
    };
    if !client.login_prompt(options, &TerminalCredentials).await? {
        warn!(server = server_url, "login was rejected");
    }
    Ok(client)
}
