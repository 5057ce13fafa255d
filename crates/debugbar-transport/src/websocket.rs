//! WebSocket channel implementation using tokio-tungstenite

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};
use url::Url;

use crate::channel::{ChannelConnector, ChannelEvent, MessageChannel, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Dials `ws://` and `wss://` endpoints
///
/// TLS negotiation is delegated entirely to tokio-tungstenite based on the
/// URL scheme.
#[derive(Debug, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChannelConnector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn MessageChannel>, TransportError> {
        let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        debug!(%url, "websocket connected");
        Ok(Box::new(WebSocketChannel { inner: stream }))
    }
}

/// A live WebSocket connection
pub struct WebSocketChannel {
    inner: WsStream,
}

#[async_trait]
impl MessageChannel for WebSocketChannel {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.inner
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::WebSocketError(e.to_string()))
    }

    async fn next_event(&mut self) -> ChannelEvent {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => return ChannelEvent::Message(text),
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|reason| !reason.is_empty())
                        .unwrap_or_else(|| "closed by server".to_string());
                    return ChannelEvent::Closed { clean: true, reason };
                }
                // Protocol pings are answered by tungstenite itself; binary
                // frames are not part of the debug bar protocol.
                Some(Ok(other)) => trace!(?other, "ignoring non-text frame"),
                Some(Err(e)) => {
                    return ChannelEvent::Closed {
                        clean: false,
                        reason: e.to_string(),
                    }
                }
                None => {
                    return ChannelEvent::Closed {
                        clean: false,
                        reason: "connection lost".to_string(),
                    }
                }
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.inner.close(None).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_websocket_schemes() {
        let connector = WebSocketConnector::new();
        let result = connector.connect("http://localhost:8080/_debugbar/ws").await;
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn rejects_unparseable_urls() {
        let connector = WebSocketConnector::new();
        let result = connector.connect("not a url").await;
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }
}
