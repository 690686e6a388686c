//! Client configuration.

use std::path::PathBuf;

use protocol::{ProtocolVersion, SessionPolicy, Username};

/// File name of the cookie jar shared with the `ndcli` command-line tool.
pub const DEFAULT_COOKIE_FILE_NAME: &str = ".ndcli.cookie";

/// Returns `~/.ndcli.cookie`, or `None` when no home directory is known.
pub fn default_cookie_file() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(DEFAULT_COOKIE_FILE_NAME))
}

/// Everything needed to construct a [`crate::DimClient`].
///
/// Built with consuming setters:
///
/// ```no_run
/// use dimclient::ClientConfig;
///
/// let config = ClientConfig::new("https://dim.example.com")
///     .cookie_file("/home/alice/.ndcli.cookie")
///     .cookie_umask(0o077);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL; endpoint paths (`/login`, `/jsonrpc`, ...) are appended to it.
    pub server_url: String,
    /// Version the server must report from `protocol_version`.
    pub protocol_version: ProtocolVersion,
    /// Where session cookies are persisted. `None` keeps them in memory only.
    pub cookie_file: Option<PathBuf>,
    /// Process umask installed while the cookie file is written.
    pub cookie_umask: Option<u32>,
    /// Whether cookies are written back to `cookie_file` at all.
    pub save_cookie: bool,
    /// Account the session is expected to belong to.
    pub username: Option<Username>,
    /// Login and probing behaviour.
    pub session_policy: SessionPolicy,
}

impl ClientConfig {
    /// Creates a configuration for `server_url` with in-memory cookies and
    /// the default session policy.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            protocol_version: ProtocolVersion::default(),
            cookie_file: None,
            cookie_umask: None,
            save_cookie: true,
            username: None,
            session_policy: SessionPolicy::default(),
        }
    }

    /// Persists cookies to `path`.
    #[must_use]
    pub fn cookie_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookie_file = Some(path.into());
        self
    }

    /// Installs `umask` while writing the cookie file (e.g. `0o077`).
    #[must_use]
    pub fn cookie_umask(mut self, umask: u32) -> Self {
        self.cookie_umask = Some(umask);
        self
    }

    /// Loads cookies from the cookie file but never writes them back.
    #[must_use]
    pub fn read_only_cookies(mut self) -> Self {
        self.save_cookie = false;
        self
    }

    /// Sets the expected account name. Empty names are ignored.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Username::new(username);
        self
    }

    /// Replaces the session policy.
    #[must_use]
    pub fn session_policy(mut self, policy: SessionPolicy) -> Self {
        self.session_policy = policy;
        self
    }

    /// Overrides the protocol version expected from the server.
    #[must_use]
    pub fn protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.protocol_version = version;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_cookies_in_memory() {
        let config = ClientConfig::new("http://localhost:5000");
        assert!(config.cookie_file.is_none());
        assert!(config.cookie_umask.is_none());
        assert!(config.save_cookie);
        assert_eq!(config.protocol_version.as_u64(), 17);
    }

    #[test]
    fn empty_username_is_ignored() {
        let config = ClientConfig::new("http://localhost:5000").username("");
        assert!(config.username.is_none());
    }

    #[test]
    fn default_cookie_file_is_in_home() {
        if let Some(path) = default_cookie_file() {
            assert!(path.ends_with(DEFAULT_COOKIE_FILE_NAME));
        }
    }
}
