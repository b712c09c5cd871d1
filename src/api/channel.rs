use crate::error::{BotError, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

/// One duplex text channel to the trade service. The session layer on
/// top of this enforces the single-outstanding-request discipline; the
/// channel itself just moves frames.
///
/// Being a trait lets the protocol logic run against a scripted channel
/// in tests.
#[async_trait]
pub trait Channel: Send {
    async fn send_text(&mut self, text: String) -> Result<()>;
    async fn recv_text(&mut self) -> Result<String>;
    async fn close(&mut self);
}

/// Live tungstenite-backed channel.
pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsChannel {
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = connect_async(url).await?;
        Ok(Self { stream })
    }
}

#[async_trait]
impl Channel for WsChannel {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<String> {
        while let Some(frame) = self.stream.next().await {
            match frame? {
                Message::Text(text) => return Ok(text),
                Message::Close(_) => break,
                // Pings are answered by tungstenite itself
                _ => continue,
            }
        }
        Err(BotError::Connect("channel closed by peer".to_string()))
    }

    async fn close(&mut self) {
        // Idempotent: closing a closed stream is a no-op error we ignore
        let _ = self.stream.close(None).await;
    }
}
