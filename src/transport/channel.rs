//! Persistent channel to the bridge.
//!
//! The connection manager only needs two things from a channel: the next
//! inbound frame, and a way to close it. [`Connector`] opens a [`Channel`];
//! [`WsConnector`] does so over WebSocket.
//!
//! # Close Codes
//!
//! A closure with [`CLOSE_NORMAL`] is an intentional shutdown. Every other
//! ending (other codes, no code, transport error, stream end) is unclean
//! and reported with the code if one was received.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Close code for an intentional shutdown.
pub const CLOSE_NORMAL: u16 = 1000;

/// Reason sent when the client closes the channel.
const CLIENT_CLOSE_REASON: &str = "client disconnect";

// ============================================================================
// Frame
// ============================================================================

/// What a channel produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text message.
    Text(String),
    /// The channel ended. `code` is the close code, if one was received.
    Closed {
        /// Close code sent by the bridge.
        code: Option<u16>,
    },
}

impl Frame {
    /// Returns `true` for a closure with [`CLOSE_NORMAL`].
    #[inline]
    #[must_use]
    pub fn is_clean_close(&self) -> bool {
        matches!(self, Self::Closed { code: Some(CLOSE_NORMAL) })
    }
}

// ============================================================================
// Traits
// ============================================================================

/// An open persistent channel.
#[async_trait]
pub trait Channel: Send {
    /// Waits for the next frame.
    ///
    /// After a [`Frame::Closed`] the channel must not be polled again.
    async fn recv(&mut self) -> Frame;

    /// Closes the channel with `code`.
    async fn close(&mut self, code: u16);
}

/// Opens persistent channels.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens a channel to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel cannot be opened.
    async fn connect(&self, url: &Url) -> Result<Box<dyn Channel>>;
}

// ============================================================================
// WebSocket
// ============================================================================

/// WebSocket stream type returned by `connect_async`.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens WebSocket channels with `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Channel>> {
        let (stream, response) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::connection(format!("WebSocket connect to {url} failed: {e}")))?;

        debug!(%url, status = response.status().as_u16(), "WebSocket handshake completed");

        Ok(Box::new(WsChannel { stream }))
    }
}

/// A WebSocket channel.
pub struct WsChannel {
    stream: WsStream,
}

#[async_trait]
impl Channel for WsChannel {
    async fn recv(&mut self) -> Frame {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    trace!(len = text.len(), "Text frame received");
                    return Frame::Text(text.as_str().to_owned());
                }

                Some(Ok(Message::Close(frame))) => {
                    let code = frame.map(|f| u16::from(f.code));
                    debug!(?code, "WebSocket closed by bridge");
                    return Frame::Closed { code };
                }

                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    return Frame::Closed { code: None };
                }

                None => {
                    debug!("WebSocket stream ended");
                    return Frame::Closed { code: None };
                }

                // Ignore Binary, Ping, Pong
                Some(Ok(_)) => {}
            }
        }
    }

    async fn close(&mut self, code: u16) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: CLIENT_CLOSE_REASON.to_string().into(),
        };

        if let Err(e) = self.stream.close(Some(frame)).await {
            debug!(error = %e, "Failed to close WebSocket cleanly");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::SinkExt;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    async fn bind() -> (TcpListener, Url) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}")).expect("url");
        (listener, url)
    }

    #[test]
    fn test_clean_close() {
        assert!(Frame::Closed { code: Some(1000) }.is_clean_close());
        assert!(!Frame::Closed { code: Some(1006) }.is_clean_close());
        assert!(!Frame::Closed { code: None }.is_clean_close());
        assert!(!Frame::Text("x".to_string()).is_clean_close());
    }

    #[tokio::test]
    async fn test_ws_channel_receives_text_then_close_code() {
        let (listener, url) = bind().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("upgrade");
            ws.send(Message::Text(
                r#"{"type":"SCAN","uid":"04AABBCC"}"#.to_string().into(),
            ))
            .await
            .expect("send");
            ws.close(Some(CloseFrame {
                code: CloseCode::Error,
                reason: String::from("reader unplugged").into(),
            }))
            .await
            .expect("close");
        });

        let mut channel = WsConnector.connect(&url).await.expect("connect");
        assert_eq!(
            channel.recv().await,
            Frame::Text(r#"{"type":"SCAN","uid":"04AABBCC"}"#.to_string())
        );
        assert_eq!(channel.recv().await, Frame::Closed { code: Some(1011) });

        server.await.expect("server task");
    }

    #[tokio::test]
    async fn test_ws_channel_client_close_is_normal() {
        let (listener, url) = bind().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("upgrade");
            match ws.next().await {
                Some(Ok(Message::Close(Some(frame)))) => u16::from(frame.code),
                other => panic!("expected close frame, got {other:?}"),
            }
        });

        let mut channel = WsConnector.connect(&url).await.expect("connect");
        channel.close(CLOSE_NORMAL).await;

        assert_eq!(server.await.expect("server task"), CLOSE_NORMAL);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let (listener, url) = bind().await;
        drop(listener);

        let result = WsConnector.connect(&url).await;
        assert!(matches!(result, Err(Error::Connection { .. })));
    }
}
