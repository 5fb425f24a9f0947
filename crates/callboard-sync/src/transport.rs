//! Transport seam for the event stream.
//!
//! [`Connector`] opens a [`Transport`]; the synchronizer only ever sees text
//! frames. [`WsConnector`] is the `tokio-tungstenite` implementation; tests
//! plug in in-memory connectors.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::errors::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One open event-stream connection.
#[async_trait]
pub trait Transport: Send {
    /// Send one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Next text frame. `None` once the peer has closed the stream.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the connection. Errors are ignored.
    async fn close(&mut self);
}

/// Opens transports.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to `url`.
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError>;
}

/// WebSocket transport.
pub struct WsTransport {
    ws: WsStream,
}

impl WsTransport {
    /// Connect to a `ws://` or `wss://` URL.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        Ok(Self { ws })
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.ws
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.ws.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "server closed event stream");
                    return None;
                }
                // tungstenite answers pings itself
                Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(e) => return Some(Err(TransportError::Other(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}

/// [`Connector`] over `tokio-tungstenite`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(WsTransport::connect(url).await?))
    }
}
