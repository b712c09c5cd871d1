use crate::api::messages::{
    BuyReply, BuyRequest, ContractStatusReply, ContractStatusRequest, ProposalReply,
    ProposalRequest,
};
use crate::api::DerivSession;
use crate::config::Config;
use crate::error::{BotError, Result};
use crate::models::{ContractType, OpenTrade, TradeOutcome};
use chrono::Utc;
use tokio::time::{sleep, Duration};

/// Submits contracts for one symbol and reconciles their settlement.
///
/// Owns the symbol's open-trade slot: a new contract is never submitted
/// while one is live, and the slot is cleared exactly once per contract,
/// by settlement or by giving up after the bounded poll loop.
pub struct TradeExecutor {
    symbol: String,
    open_trade: Option<OpenTrade>,
}

impl TradeExecutor {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            open_trade: None,
        }
    }

    pub fn has_open_trade(&self) -> bool {
        self.open_trade.is_some()
    }

    /// Quote, purchase and settle one contract in sequence.
    ///
    /// Returns `Ok(None)` without touching the service when a trade is
    /// already open. A `SettlementTimeout` clears the open-trade slot
    /// but yields no outcome: the caller must leave the stake alone.
    pub async fn execute(
        &mut self,
        session: &mut DerivSession,
        direction: ContractType,
        stake: f64,
        config: &Config,
    ) -> Result<Option<TradeOutcome>> {
        match self.submit(session, direction, stake, config).await? {
            Some(_contract_id) => self.settle_open(session, config).await,
            None => Ok(None),
        }
    }

    /// Request a quote and purchase it. On success the open-trade slot
    /// holds the new contract and its id is returned; `Ok(None)` means a
    /// trade was already open and nothing was sent.
    pub async fn submit(
        &mut self,
        session: &mut DerivSession,
        direction: ContractType,
        stake: f64,
        config: &Config,
    ) -> Result<Option<u64>> {
        if self.open_trade.is_some() {
            tracing::info!("[{}] trade already open, skipping", self.symbol);
            return Ok(None);
        }

        let amount = round_cents(stake);

        let proposal: ProposalReply = session
            .request(&ProposalRequest {
                proposal: 1,
                amount,
                basis: "stake".to_string(),
                contract_type: direction,
                currency: config.currency.clone(),
                duration: config.contract_duration,
                duration_unit: config.duration_unit.clone(),
                symbol: self.symbol.clone(),
            })
            .await?;
        let (quote_id, ask_price) = proposal
            .proposal
            .and_then(|p| p.id.map(|id| (id, p.ask_price)))
            .ok_or(BotError::Submission { stage: "quote" })?;

        let buy: BuyReply = session
            .request(&BuyRequest {
                buy: quote_id,
                price: ask_price.unwrap_or(amount),
            })
            .await?;
        let contract_id = buy
            .buy
            .and_then(|b| b.contract_id)
            .ok_or(BotError::Submission { stage: "purchase" })?;

        tracing::info!(
            "📊 [{}] trade sent: {} | stake ${:.2} | contract {}",
            self.symbol,
            direction,
            amount,
            contract_id
        );
        self.open_trade = Some(OpenTrade {
            contract_id,
            direction,
            stake: amount,
            opened_at: Utc::now(),
        });
        Ok(Some(contract_id))
    }

    /// Wait out the open contract, then poll its status a bounded number
    /// of times. Whatever happens, the open-trade slot is empty
    /// afterwards; only a confirmed settlement produces an outcome.
    pub async fn settle_open(
        &mut self,
        session: &mut DerivSession,
        config: &Config,
    ) -> Result<Option<TradeOutcome>> {
        let contract_id = match &self.open_trade {
            Some(trade) => trade.contract_id,
            None => return Ok(None),
        };

        sleep(Duration::from_secs(config.settlement_wait_secs())).await;

        for attempt in 1..=config.max_poll_attempts {
            let reply = session
                .request::<_, ContractStatusReply>(&ContractStatusRequest::new(contract_id))
                .await;
            let reply = match reply {
                Ok(reply) => reply,
                Err(error) => {
                    // Channel died mid-settlement: outcome unknown, same
                    // contract as a timeout for staking purposes
                    self.open_trade = None;
                    return Err(error);
                }
            };

            if let Some(contract) = reply.proposal_open_contract {
                if contract.is_settled() {
                    let profit = contract.profit.unwrap_or(0.0);
                    self.open_trade = None;
                    return Ok(Some(TradeOutcome::new(profit)));
                }
            }

            tracing::debug!(
                "[{}] contract {} still open (poll {}/{})",
                self.symbol,
                contract_id,
                attempt,
                config.max_poll_attempts
            );
            if attempt < config.max_poll_attempts {
                sleep(Duration::from_secs(config.poll_interval_secs)).await;
            }
        }

        self.open_trade = None;
        Err(BotError::SettlementTimeout {
            attempts: config.max_poll_attempts,
        })
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::channel::testing::ScriptedChannel;

    const AUTH_OK: &str = r#"{"authorize":{"balance":250.0}}"#;
    const PROPOSAL_OK: &str = r#"{"proposal":{"id":"abc-123","ask_price":0.35}}"#;
    const BUY_OK: &str = r#"{"buy":{"contract_id":987654,"buy_price":0.35}}"#;
    const STATUS_OPEN: &str = r#"{"proposal_open_contract":{"status":"open","is_sold":0}}"#;
    const STATUS_WIN: &str =
        r#"{"proposal_open_contract":{"status":"sold","profit":0.27,"is_sold":1}}"#;
    const STATUS_LOSS: &str =
        r#"{"proposal_open_contract":{"status":"sold","profit":-0.35,"is_sold":1}}"#;

    async fn session_with(replies: Vec<&str>) -> DerivSession {
        let mut script = vec![AUTH_OK];
        script.extend(replies);
        DerivSession::handshake(Box::new(ScriptedChannel::new(script)), "token")
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_winning_trade_yields_outcome_and_clears_slot() {
        let mut session = session_with(vec![PROPOSAL_OK, BUY_OK, STATUS_WIN]).await;
        let mut executor = TradeExecutor::new("R_10");

        let outcome = executor
            .execute(&mut session, ContractType::Call, 0.35, &Config::default())
            .await
            .unwrap()
            .unwrap();

        assert!(outcome.win);
        assert_eq!(outcome.profit, 0.27);
        assert!(!executor.has_open_trade());
    }

    #[tokio::test(start_paused = true)]
    async fn test_losing_trade_yields_loss_outcome() {
        let mut session = session_with(vec![PROPOSAL_OK, BUY_OK, STATUS_LOSS]).await;
        let mut executor = TradeExecutor::new("R_10");

        let outcome = executor
            .execute(&mut session, ContractType::Put, 0.35, &Config::default())
            .await
            .unwrap()
            .unwrap();

        assert!(!outcome.win);
        assert_eq!(outcome.profit, -0.35);
        assert!(!executor.has_open_trade());
    }

    #[tokio::test(start_paused = true)]
    async fn test_settlement_polls_until_sold() {
        let mut session =
            session_with(vec![PROPOSAL_OK, BUY_OK, STATUS_OPEN, STATUS_OPEN, STATUS_WIN]).await;
        let mut executor = TradeExecutor::new("R_10");

        let outcome = executor
            .execute(&mut session, ContractType::Call, 0.35, &Config::default())
            .await
            .unwrap();
        assert!(outcome.unwrap().win);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settlement_timeout_clears_slot_without_outcome() {
        let config = Config {
            max_poll_attempts: 3,
            ..Config::default()
        };
        let mut session =
            session_with(vec![PROPOSAL_OK, BUY_OK, STATUS_OPEN, STATUS_OPEN, STATUS_OPEN]).await;
        let mut executor = TradeExecutor::new("R_10");

        let result = executor
            .execute(&mut session, ContractType::Call, 0.35, &config)
            .await;

        assert!(matches!(
            result,
            Err(BotError::SettlementTimeout { attempts: 3 })
        ));
        assert!(!executor.has_open_trade());
    }

    #[tokio::test]
    async fn test_missing_quote_id_is_submission_error() {
        let mut session = session_with(vec![r#"{"msg_type":"proposal"}"#]).await;
        let mut executor = TradeExecutor::new("R_10");

        let result = executor
            .execute(&mut session, ContractType::Call, 0.35, &Config::default())
            .await;

        assert!(matches!(
            result,
            Err(BotError::Submission { stage: "quote" })
        ));
        assert!(!executor.has_open_trade());
    }

    #[tokio::test]
    async fn test_missing_contract_id_is_submission_error() {
        let mut session = session_with(vec![PROPOSAL_OK, r#"{"buy":{}}"#]).await;
        let mut executor = TradeExecutor::new("R_10");

        let result = executor
            .execute(&mut session, ContractType::Call, 0.35, &Config::default())
            .await;

        assert!(matches!(
            result,
            Err(BotError::Submission { stage: "purchase" })
        ));
        assert!(!executor.has_open_trade());
    }

    #[tokio::test]
    async fn test_open_trade_makes_submit_a_noop() {
        let mut session = session_with(vec![]).await;
        let mut executor = TradeExecutor::new("R_10");
        executor.open_trade = Some(OpenTrade {
            contract_id: 1,
            direction: ContractType::Call,
            stake: 0.35,
            opened_at: Utc::now(),
        });

        // No replies scripted: touching the service would error
        let result = executor
            .submit(&mut session, ContractType::Put, 0.72, &Config::default())
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(executor.has_open_trade());
    }

    #[tokio::test]
    async fn test_settle_without_open_trade_is_a_noop() {
        let mut session = session_with(vec![]).await;
        let mut executor = TradeExecutor::new("R_10");

        let outcome = executor
            .settle_open(&mut session, &Config::default())
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_death_during_settlement_clears_slot() {
        // Script ends after the buy reply; the first status poll dies
        let mut session = session_with(vec![PROPOSAL_OK, BUY_OK]).await;
        let mut executor = TradeExecutor::new("R_10");

        let result = executor
            .execute(&mut session, ContractType::Call, 0.35, &Config::default())
            .await;

        assert!(matches!(result, Err(BotError::Connect(_))));
        assert!(!executor.has_open_trade());
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(0.348), 0.35);
        assert_eq!(round_cents(0.35 * 2.05), 0.72);
        assert_eq!(round_cents(1.0), 1.0);
    }
}
