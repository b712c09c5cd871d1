use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One OHLCV candle as returned by the ticks_history call.
///
/// Candles arrive oldest-first and are immutable once received. Some
/// synthetic indices report no volume; those candles carry 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub epoch: i64,
}

impl Candle {
    pub fn body_color(&self) -> BodyColor {
        if self.close > self.open {
            BodyColor::Green
        } else if self.close < self.open {
            BodyColor::Red
        } else {
            BodyColor::Doji
        }
    }

}

/// Candle body classification: green closes up, red closes down,
/// doji closes flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyColor {
    Green,
    Red,
    Doji,
}

/// Direction of a binary contract. Serialized as the provider's
/// contract_type field ("CALL" / "PUT").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractType {
    #[serde(rename = "CALL")]
    Call,
    #[serde(rename = "PUT")]
    Put,
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractType::Call => write!(f, "CALL"),
            ContractType::Put => write!(f, "PUT"),
        }
    }
}

/// A live contract. At most one exists per symbol at any time; it is
/// created on a successful purchase and cleared exactly once, either by
/// settlement or by a settlement timeout.
#[derive(Debug, Clone)]
pub struct OpenTrade {
    pub contract_id: u64,
    pub direction: ContractType,
    pub stake: f64,
    pub opened_at: DateTime<Utc>,
}

/// Realized result of a settled contract.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeOutcome {
    pub profit: f64,
    pub win: bool,
}

impl TradeOutcome {
    pub fn new(profit: f64) -> Self {
        Self {
            profit,
            win: profit > 0.0,
        }
    }
}
