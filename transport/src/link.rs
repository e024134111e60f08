use crate::error::Error;
use async_trait::async_trait;
use std::sync::Arc;

/// Opens connections to the remote device.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Performs the full handshake (transport, protocol, authentication).
    async fn connect(&self) -> Result<Arc<dyn Link>, Error>;

    /// Human-readable target for log lines, e.g. `user@host:22`.
    fn describe(&self) -> String;
}

/// One established connection.
#[async_trait]
pub trait Link: Send + Sync {
    /// Delivers one encrypted payload as a single opaque unit.
    async fn transmit(&self, ciphertext: &str) -> Result<(), Error>;

    /// Resolves once the link has errored, been closed or reached end of stream.
    async fn closed(&self);
}
