//! Typed request/response records for the Deriv wire protocol.
//!
//! Every field the service might omit is an `Option`: absence is a
//! value to branch on, never a deserialization fault.

use crate::models::{Candle, ContractType};
use serde::{Deserialize, Serialize};

/// Error object the service attaches to any failed call.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorField {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ApiErrorField {
    pub fn reason(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| "no reason supplied".to_string())
    }
}

// --- authorize ---

#[derive(Debug, Serialize)]
pub struct AuthorizeRequest {
    pub authorize: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeReply {
    pub authorize: Option<AuthorizeDetails>,
    pub error: Option<ApiErrorField>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeDetails {
    pub balance: f64,
    pub currency: Option<String>,
}

// --- ticks_history ---

#[derive(Debug, Serialize)]
pub struct TicksHistoryRequest {
    pub ticks_history: String,
    pub end: String,
    pub count: u32,
    pub granularity: u32,
    pub style: String,
}

impl TicksHistoryRequest {
    pub fn latest_candles(symbol: &str, count: u32, granularity: u32) -> Self {
        Self {
            ticks_history: symbol.to_string(),
            end: "latest".to_string(),
            count,
            granularity,
            style: "candles".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TicksHistoryReply {
    pub candles: Option<Vec<RawCandle>>,
    pub error: Option<ApiErrorField>,
}

/// Candle as it appears on the wire. Volume is genuinely optional:
/// synthetic indices omit it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCandle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
    pub epoch: i64,
}

impl From<RawCandle> for Candle {
    fn from(raw: RawCandle) -> Self {
        Candle {
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume.unwrap_or(0.0),
            epoch: raw.epoch,
        }
    }
}

// --- proposal ---

#[derive(Debug, Serialize)]
pub struct ProposalRequest {
    pub proposal: u8,
    pub amount: f64,
    pub basis: String,
    pub contract_type: ContractType,
    pub currency: String,
    pub duration: u32,
    pub duration_unit: String,
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
pub struct ProposalReply {
    pub proposal: Option<ProposalDetails>,
    pub error: Option<ApiErrorField>,
}

#[derive(Debug, Deserialize)]
pub struct ProposalDetails {
    pub id: Option<String>,
    pub ask_price: Option<f64>,
}

// --- buy ---

#[derive(Debug, Serialize)]
pub struct BuyRequest {
    pub buy: String,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
pub struct BuyReply {
    pub buy: Option<BuyDetails>,
    pub error: Option<ApiErrorField>,
}

#[derive(Debug, Deserialize)]
pub struct BuyDetails {
    pub contract_id: Option<u64>,
    pub buy_price: Option<f64>,
}

// --- proposal_open_contract ---

#[derive(Debug, Serialize)]
pub struct ContractStatusRequest {
    pub proposal_open_contract: u8,
    pub contract_id: u64,
}

impl ContractStatusRequest {
    pub fn new(contract_id: u64) -> Self {
        Self {
            proposal_open_contract: 1,
            contract_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ContractStatusReply {
    pub proposal_open_contract: Option<ContractStatus>,
    pub error: Option<ApiErrorField>,
}

#[derive(Debug, Deserialize)]
pub struct ContractStatus {
    pub status: Option<String>,
    pub profit: Option<f64>,
    pub is_sold: Option<u8>,
}

impl ContractStatus {
    /// A contract is settled once it leaves the "open" state.
    pub fn is_settled(&self) -> bool {
        if self.is_sold == Some(1) {
            return true;
        }
        matches!(self.status.as_deref(), Some(s) if s != "open")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_candle_without_volume_maps_to_zero() {
        let raw: RawCandle =
            serde_json::from_str(r#"{"open":1.0,"high":2.0,"low":0.5,"close":1.5,"epoch":1700000000}"#)
                .unwrap();
        let candle: Candle = raw.into();
        assert_eq!(candle.volume, 0.0);
        assert_eq!(candle.close, 1.5);
    }

    #[test]
    fn test_contract_status_settled() {
        let sold = ContractStatus {
            status: Some("sold".to_string()),
            profit: Some(0.27),
            is_sold: None,
        };
        assert!(sold.is_settled());

        let open = ContractStatus {
            status: Some("open".to_string()),
            profit: None,
            is_sold: Some(0),
        };
        assert!(!open.is_settled());

        let sold_flag_only = ContractStatus {
            status: None,
            profit: Some(-0.35),
            is_sold: Some(1),
        };
        assert!(sold_flag_only.is_settled());
    }

    #[test]
    fn test_proposal_request_serializes_contract_type_uppercase() {
        let request = ProposalRequest {
            proposal: 1,
            amount: 0.35,
            basis: "stake".to_string(),
            contract_type: ContractType::Call,
            currency: "USD".to_string(),
            duration: 10,
            duration_unit: "m".to_string(),
            symbol: "R_10".to_string(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""contract_type":"CALL""#));
        assert!(json.contains(r#""basis":"stake""#));
    }
}
