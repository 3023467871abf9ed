//! Trait abstraction for opening the receiver byte source to enable testing

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::Result;

/// An open, readable receiver connection
pub type BoxedPort = Box<dyn AsyncRead + Send + Unpin>;

/// Opens a fresh connection to the receiver on every call
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PortConnector: Send + Sync {
    /// Open the connection
    async fn connect(&self) -> Result<BoxedPort>;

    /// Human-readable endpoint description for logs (e.g. `/dev/ttyUSB0 @ 9600`)
    fn describe(&self) -> String;
}
