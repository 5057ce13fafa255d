//! Reconnecting transport for the debug bar client
//!
//! Wraps an abstract duplex text-message channel (WebSocket in production)
//! with connect/disconnect lifecycle, fixed-delay reconnection, liveness
//! pings, and status fan-out to registered observers.
//!
//! A single driver task owns the live channel and serializes every state
//! transition, so observers always see status changes and deliveries in
//! the order they happened.

pub mod channel;
pub mod reconnect;
pub mod transport;
pub mod websocket;

pub use channel::{ChannelConnector, ChannelEvent, MessageChannel, TransportError};
pub use reconnect::ReconnectPolicy;
pub use transport::{
    ConnectionStatus, HandlerId, ReconnectingTransport, TransportConfig, PING_INTERVAL,
};
pub use websocket::{WebSocketChannel, WebSocketConnector};
