use thiserror::Error;

/// Everything that can go wrong inside one symbol's trading cycle.
///
/// None of these are fatal: the cycle logs the error, backs off and
/// reconnects. A failing symbol never affects the other symbol tasks.
#[derive(Debug, Error)]
pub enum BotError {
    /// The websocket channel could not be established or died mid-session.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The provider rejected our credentials.
    #[error("authorization rejected: {0}")]
    Auth(String),

    /// A reply was missing an expected field or could not be decoded.
    #[error("malformed reply: {0}")]
    Protocol(String),

    /// The trade could not be placed. `stage` is "quote" or "purchase".
    #[error("trade submission failed at {stage} stage")]
    Submission { stage: &'static str },

    /// The contract outcome was still unknown after the bounded poll loop.
    /// The open-trade flag is cleared but the stake must not be adjusted.
    #[error("settlement not confirmed after {attempts} polls")]
    SettlementTimeout { attempts: u32 },
}

impl From<tokio_tungstenite::tungstenite::Error> for BotError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        BotError::Connect(err.to_string())
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Protocol(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
