//! Interactive terminal credential source.

use async_trait::async_trait;
use dialoguer::{Input, Password};
use protocol::{CredentialError, CredentialSource};

/// Asks for the username with echo and for the password without.
///
/// Prompts run on the blocking thread pool so the runtime is not stalled
/// while the user types.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalCredentials;

async fn prompt<F>(field: &'static str, read: F) -> Result<String, CredentialError>
where
    F: FnOnce() -> dialoguer::Result<String> + Send + 'static,
{
    let failed = |reason: String| CredentialError { field, reason };
    tokio::task::spawn_blocking(read)
        .await
        .map_err(|e| failed(e.to_string()))?
        .map_err(|e| failed(e.to_string()))
}

#[async_trait]
impl CredentialSource for TerminalCredentials {
    async fn username(&self) -> Result<String, CredentialError> {
        prompt("username", || {
            Input::<String>::new().with_prompt("Username").interact_text()
        })
        .await
    }

    async fn password(&self, username: &str) -> Result<String, CredentialError> {
        let label = format!("Password for {username}");
        prompt("password", move || Password::new().with_prompt(label).interact()).await
    }
}
