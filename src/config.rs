use crate::staking::{Staking, StakingPolicy};
use crate::strategy::DirectionMapping;
use anyhow::Context;

const WS_ENDPOINT: &str = "wss://ws.derivws.com/websockets/v3";

/// Process-wide configuration. Built once at startup from the
/// environment and never mutated afterwards; every component receives it
/// by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_id: u64,
    pub api_token: String,
    pub currency: String,
    pub symbols: Vec<String>,

    /// Candle width in seconds.
    pub granularity: u32,
    /// Fixed number of candles per history request.
    pub candle_count: u32,
    pub min_candles: usize,
    pub volume_threshold: f64,
    pub direction_mapping: DirectionMapping,

    pub staking: Staking,

    /// Contract length, in `duration_unit` units.
    pub contract_duration: u32,
    pub duration_unit: String,
    /// Extra wait after the nominal contract end before the first
    /// settlement poll.
    pub settlement_buffer_secs: u64,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: u32,

    pub idle_delay_secs: u64,
    pub backoff_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_id: 71130,
            api_token: String::new(),
            currency: "USD".to_string(),
            symbols: vec![
                "R_10".to_string(),
                "R_25".to_string(),
                "R_50".to_string(),
                "R_75".to_string(),
                "R_100".to_string(),
            ],
            granularity: 60,
            candle_count: 10,
            min_candles: 5,
            volume_threshold: 0.5,
            direction_mapping: DirectionMapping::ReversalFading,
            staking: Staking {
                policy: StakingPolicy::SteppedMartingale { multiplier: 2.05 },
                initial_stake: 0.35,
                max_stake: None,
            },
            contract_duration: 10,
            duration_unit: "m".to_string(),
            settlement_buffer_secs: 5,
            poll_interval_secs: 5,
            max_poll_attempts: 12,
            idle_delay_secs: 5,
            backoff_secs: 10,
        }
    }
}

impl Config {
    /// Load configuration from the environment. Only the API token is
    /// mandatory; everything else falls back to the defaults above.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();

        let api_token =
            std::env::var("DERIV_API_TOKEN").context("DERIV_API_TOKEN not found in environment")?;

        let initial_stake = env_or("INITIAL_STAKE", defaults.staking.initial_stake);
        let policy = match std::env::var("STAKING_POLICY").ok().as_deref() {
            Some("compounding") => StakingPolicy::Compounding,
            _ => StakingPolicy::SteppedMartingale {
                multiplier: env_or("MARTINGALE_MULTIPLIER", 2.05),
            },
        };
        let max_stake = std::env::var("MAX_STAKE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok());

        let direction_mapping = match std::env::var("DIRECTION_MAPPING").ok().as_deref() {
            Some("following") => DirectionMapping::ReversalFollowing,
            _ => DirectionMapping::ReversalFading,
        };

        Ok(Self {
            app_id: env_or("DERIV_APP_ID", defaults.app_id),
            api_token,
            currency: env_or("CURRENCY", defaults.currency),
            symbols: std::env::var("SYMBOLS")
                .ok()
                .map(|s| parse_symbol_list(&s))
                .unwrap_or(defaults.symbols),
            granularity: env_or("GRANULARITY", defaults.granularity),
            candle_count: defaults.candle_count,
            min_candles: env_or("MIN_CANDLES_REQUIRED", defaults.min_candles),
            volume_threshold: env_or("VOLUME_THRESHOLD", defaults.volume_threshold),
            direction_mapping,
            staking: Staking {
                policy,
                initial_stake,
                max_stake,
            },
            contract_duration: env_or("CONTRACT_DURATION", defaults.contract_duration),
            duration_unit: env_or("CONTRACT_DURATION_UNIT", defaults.duration_unit),
            settlement_buffer_secs: env_or("SETTLEMENT_BUFFER_SECS", defaults.settlement_buffer_secs),
            poll_interval_secs: env_or("SETTLEMENT_POLL_SECS", defaults.poll_interval_secs),
            max_poll_attempts: env_or("SETTLEMENT_MAX_POLLS", defaults.max_poll_attempts),
            idle_delay_secs: env_or("IDLE_DELAY_SECS", defaults.idle_delay_secs),
            backoff_secs: env_or("ERROR_BACKOFF_SECS", defaults.backoff_secs),
        })
    }

    pub fn ws_url(&self) -> String {
        format!("{}?app_id={}", WS_ENDPOINT, self.app_id)
    }

    /// Nominal contract length in seconds.
    pub fn contract_duration_secs(&self) -> u64 {
        let d = self.contract_duration as u64;
        match self.duration_unit.as_str() {
            "s" => d,
            "t" => d * 2, // ticks land roughly every two seconds
            "h" => d * 3600,
            "d" => d * 86_400,
            _ => d * 60, // "m" and anything unrecognized
        }
    }

    /// How long to wait after purchase before polling for settlement.
    pub fn settlement_wait_secs(&self) -> u64 {
        self.contract_duration_secs() + self.settlement_buffer_secs
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
