//! Protocol-version handshake.

use protocol::ProtocolError;
use tracing::debug;

use crate::{ClientError, DimClient};

impl DimClient {
    /// Confirms the server speaks this client's protocol version.
    ///
    /// Runs on every successful login and is the only compatibility gate.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InterfaceMissing`] when `protocol_version` cannot be
    ///   called at all, carrying the underlying failure text.
    /// - [`ProtocolError::VersionMismatch`] when the server reports any other
    ///   value than the configured version.
    pub async fn check_protocol_version(&self) -> Result<(), ClientError> {
        let reported = self
            .protocol_version()
            .await
            .map_err(|e| ProtocolError::InterfaceMissing {
                detail: e.to_string(),
            })?;

        if reported.as_u64() != Some(self.protocol.as_u64()) {
            return Err(ProtocolError::VersionMismatch {
                server: reported.to_string(),
                client: self.protocol,
            }
            .into());
        }
        debug!(version = %self.protocol, "server protocol version matches");
        Ok(())
    }
}
