//! Session lifecycle: login, probing, username verification, and logout.
//!
//! A stored session cookie is reused across process runs. Credentials are
//! only submitted when the stored session no longer validates, and every
//! successful login is followed by the protocol-version check before the
//! session is persisted.

use protocol::{CredentialSource, Username};
use reqwest::StatusCode;
use tracing::{debug, error, info, instrument, warn};

use crate::cookies::SESSION_COOKIE;
use crate::{ClientError, DimClient};

/// Form login endpoint.
pub const LOGIN_PATH: &str = "/login";
/// Lightweight authenticated page used to probe the session.
pub const INDEX_PATH: &str = "/index.html";
/// Server-side session termination.
pub const LOGOUT_PATH: &str = "/logout";

/// Inputs of [`DimClient::login_prompt`].
#[derive(Debug, Clone, Default)]
pub struct LoginOptions {
    /// Username to log in with; falls back to the configured username, then
    /// to the credential source.
    pub username: Option<String>,
    /// Password; read from the credential source when absent.
    pub password: Option<String>,
    /// Ask the server for a permanent session. `None` uses the session
    /// policy's default.
    pub permanent_session: Option<bool>,
    /// Submit credentials even when the stored session is still valid.
    pub ignore_cookie: bool,
}

// Python-style booleans; the login form is parsed by a Flask handler.
fn form_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

impl DimClient {
    /// Logs in with `username` and `password`.
    ///
    /// Returns `Ok(false)` when the login request fails or is rejected (the
    /// failure is logged), so callers can retry with other credentials.
    /// On success the protocol version is checked, the username recorded and
    /// the cookies persisted.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Protocol`] when the server is not compatible; the
    ///   session obtained by this attempt is discarded.
    /// - [`ClientError::CookieSave`] when the cookie file cannot be written.
    #[instrument(skip(self, password), fields(server = %self.base_url))]
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
        permanent_session: bool,
    ) -> Result<bool, ClientError> {
        if self.policy.purge_on_login {
            self.purge_session_cookie();
        }

        let url = self.endpoint(LOGIN_PATH);
        let form = [
            ("username", username),
            ("password", password),
            ("permanent_session", form_bool(permanent_session)),
        ];
        let outcome = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);
        if let Err(e) = outcome {
            error!("Login failed: {e}");
            return Ok(false);
        }

        if let Err(e) = self.check_protocol_version().await {
            self.purge_session_cookie();
            return Err(e);
        }

        self.username = Username::new(username);
        self.cookies.save()?;
        info!("logged in");
        Ok(true)
    }

    /// Probes whether the stored session is accepted by the server.
    ///
    /// `403 Forbidden` means "not logged in". On success the cookies are
    /// persisted again because the server may have rotated them.
    ///
    /// # Errors
    ///
    /// Any other failure of the probe request, including other non-success
    /// statuses, and cookie-file write failures.
    pub async fn logged_in(&self) -> Result<bool, ClientError> {
        let url = self.endpoint(INDEX_PATH);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            debug!("session probe rejected; not logged in");
            return Ok(false);
        }
        if !status.is_success() {
            return Err(ClientError::HttpStatus { status, url });
        }

        self.cookies.save()?;
        Ok(true)
    }

    /// Like [`DimClient::logged_in`], but also requires the session to belong
    /// to the configured username.
    ///
    /// # Errors
    ///
    /// Failures of the probe or of the whoami call.
    pub async fn verify_logged_in_username(&self) -> Result<bool, ClientError> {
        if !self.logged_in().await? {
            return Ok(false);
        }

        let remote = self.whoami().await?;
        let Some(expected) = &self.username else {
            warn!(remote = %remote, "no username configured; cannot verify session owner");
            return Ok(false);
        };
        if remote.as_str() != Some(expected.as_str()) {
            warn!(
                expected = %expected,
                remote = %remote,
                "session belongs to a different user"
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Validates the stored session the way the session policy asks for.
    ///
    /// # Errors
    ///
    /// See [`DimClient::logged_in`] and [`DimClient::verify_logged_in_username`].
    pub async fn is_session_valid(&self) -> Result<bool, ClientError> {
        if self.policy.verify_username {
            self.verify_logged_in_username().await
        } else {
            self.logged_in().await
        }
    }

    /// Reuses the stored session if it is still valid, otherwise logs in with
    /// the given credentials, asking `credentials` for whatever is missing.
    ///
    /// # Errors
    ///
    /// Probe failures, credential-source failures, and the errors of
    /// [`DimClient::login`].
    #[instrument(skip_all, fields(server = %self.base_url, ignore_cookie = options.ignore_cookie))]
    pub async fn login_prompt(
        &mut self,
        options: LoginOptions,
        credentials: &dyn CredentialSource,
    ) -> Result<bool, ClientError> {
        if !options.ignore_cookie && self.is_session_valid().await? {
            debug!("stored session is valid");
            return Ok(true);
        }

        let username = match options
            .username
            .or_else(|| self.username.as_ref().map(|u| u.as_str().to_string()))
        {
            Some(username) => username,
            None => credentials.username().await?,
        };
        let password = match options.password {
            Some(password) => password,
            None => credentials.password(&username).await?,
        };
        let permanent_session = options
            .permanent_session
            .unwrap_or(self.policy.permanent_session_default);

        self.login(&username, &password, permanent_session).await
    }

    /// Ends the session: tells the server (best effort), then drops and
    /// persists the removal of the session cookie.
    ///
    /// # Errors
    ///
    /// Only cookie-file write failures; a failing logout request is logged.
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        let url = self.endpoint(LOGOUT_PATH);
        let outcome = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);
        if let Err(e) = outcome {
            warn!("Logout request failed: {e}");
        }

        self.purge_session_cookie();
        self.cookies.save()?;
        info!("logged out");
        Ok(())
    }

    /// Whether the jar currently holds a session cookie for this server.
    pub fn has_session_cookie(&self) -> bool {
        self.cookies
            .contains(&self.cookie_domain, &self.cookie_path, SESSION_COOKIE)
    }

    fn purge_session_cookie(&self) {
        self.cookies
            .purge(&self.cookie_domain, &self.cookie_path, SESSION_COOKIE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_session_uses_python_booleans() {
        assert_eq!(form_bool(true), "True");
        assert_eq!(form_bool(false), "False");
    }

    #[test]
    fn login_options_default_to_cookie_reuse() {
        let options = LoginOptions::default();
        assert!(!options.ignore_cookie);
        assert!(options.permanent_session.is_none());
    }
}
