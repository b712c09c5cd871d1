use crate::api::channel::{Channel, WsChannel};
use crate::api::messages::{
    AuthorizeReply, AuthorizeRequest, TicksHistoryReply, TicksHistoryRequest,
};
use crate::config::Config;
use crate::error::{BotError, Result};
use crate::models::Candle;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// One authenticated session with the trade service.
///
/// The protocol allows exactly one request in flight: `request` sends
/// and then waits for the single reply. Taking `&mut self` makes a
/// second concurrent request unrepresentable.
pub struct DerivSession {
    channel: Box<dyn Channel>,
    balance: f64,
}

/// A fetched candle history plus the volume list captured for the whole
/// batch. The analyzer's weakness baseline is cheaper to capture here
/// than to recompute.
#[derive(Debug, Clone)]
pub struct CandleBatch {
    pub candles: Vec<Candle>,
    pub volumes: Vec<f64>,
}

impl DerivSession {
    /// Connect and authenticate. The channel is discarded on a rejected
    /// credential.
    pub async fn open(config: &Config) -> Result<Self> {
        let channel = WsChannel::connect(&config.ws_url()).await?;
        Self::handshake(Box::new(channel), &config.api_token).await
    }

    /// Authenticate over an already-established channel.
    pub async fn handshake(channel: Box<dyn Channel>, token: &str) -> Result<Self> {
        let mut session = Self {
            channel,
            balance: 0.0,
        };

        let reply: AuthorizeReply = session
            .request(&AuthorizeRequest {
                authorize: token.to_string(),
            })
            .await?;

        if let Some(error) = reply.error {
            return Err(BotError::Auth(error.reason()));
        }
        let details = reply
            .authorize
            .ok_or_else(|| BotError::Protocol("authorize reply missing account details".to_string()))?;

        session.balance = details.balance;
        Ok(session)
    }

    /// Account balance reported at authorization time.
    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Send one request and consume its single reply.
    pub async fn request<T, R>(&mut self, request: &T) -> Result<R>
    where
        T: Serialize + Sync,
        R: DeserializeOwned,
    {
        let text = serde_json::to_string(request)?;
        self.channel.send_text(text).await?;
        let reply = self.channel.recv_text().await?;
        Ok(serde_json::from_str(&reply)?)
    }

    /// Fetch the latest candle history for a symbol.
    ///
    /// An absent or undecodable candle array yields an empty batch:
    /// callers treat emptiness as "insufficient data", not a failure.
    /// Channel errors still propagate.
    pub async fn fetch_candles(
        &mut self,
        symbol: &str,
        granularity: u32,
        count: u32,
    ) -> Result<CandleBatch> {
        let request = TicksHistoryRequest::latest_candles(symbol, count, granularity);
        let raw = match self.request::<_, TicksHistoryReply>(&request).await {
            Ok(reply) => reply.candles.unwrap_or_default(),
            Err(BotError::Protocol(reason)) => {
                tracing::warn!("[{}] unreadable candle reply: {}", symbol, reason);
                Vec::new()
            }
            Err(other) => return Err(other),
        };

        // Only candles that actually report volume feed the baseline
        let volumes: Vec<f64> = raw.iter().filter_map(|c| c.volume).collect();
        let candles: Vec<Candle> = raw.into_iter().map(Candle::from).collect();
        Ok(CandleBatch { candles, volumes })
    }

    /// Release the channel. Safe to call more than once.
    pub async fn close(&mut self) {
        self.channel.close().await;
    }
}
