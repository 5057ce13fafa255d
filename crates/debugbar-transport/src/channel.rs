//! Abstract duplex text-message channel

use async_trait::async_trait;
use thiserror::Error;

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),
}

/// Lifecycle event emitted by a channel
///
/// Opening is implicit in a successful connect. Socket-level errors fold
/// into the abnormal close that always follows them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// One text delivery; may batch several newline-separated frames
    Message(String),
    /// The channel terminated; `clean` distinguishes a deliberate close
    /// from a lost connection
    Closed { clean: bool, reason: String },
}

/// Duplex text-message connection to the telemetry server
#[async_trait]
pub trait MessageChannel: Send {
    /// Transmit one text message
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Wait for the next lifecycle event
    async fn next_event(&mut self) -> ChannelEvent;

    /// Close the channel cleanly
    async fn close(&mut self);
}

/// Dials new channels for the transport
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn MessageChannel>, TransportError>;
}
