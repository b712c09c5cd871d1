use crate::api::DerivSession;
use crate::config::Config;
use crate::error::{BotError, Result};
use crate::execution::TradeExecutor;
use crate::staking::StakeState;
use crate::strategy::{analyze, ReversalConfig};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

/// Seam between the cycle and the live service, so the whole state
/// machine can run against a scripted channel in tests.
#[async_trait]
pub trait Connect: Send + Sync {
    async fn connect(&self, config: &Config) -> Result<DerivSession>;
}

/// Production connector: dial the websocket endpoint and authenticate.
pub struct DerivConnect;

#[async_trait]
impl Connect for DerivConnect {
    async fn connect(&self, config: &Config) -> Result<DerivSession> {
        DerivSession::open(config).await
    }
}

/// Where one symbol's cycle currently is. The machine has no terminal
/// state: it loops until the fleet is shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Disconnected,
    Authenticating,
    Fetching,
    Analyzing,
    Idle,
    Trading,
    Settling,
}

/// One symbol's endless trading loop:
/// connect → fetch → analyze → (idle | trade → settle) → disconnect.
///
/// Each cycle owns all of its mutable state (session, stake, open-trade
/// slot); nothing is shared between symbols but the immutable config.
pub struct SymbolCycle {
    symbol: String,
    config: Arc<Config>,
    connector: Arc<dyn Connect>,
    reversal: ReversalConfig,
    executor: TradeExecutor,
    stake_state: StakeState,
    state: CycleState,
}

impl SymbolCycle {
    pub fn new(symbol: String, config: Arc<Config>, connector: Arc<dyn Connect>) -> Self {
        let reversal = ReversalConfig {
            min_candles: config.min_candles,
            volume_threshold: config.volume_threshold,
            mapping: config.direction_mapping,
        };
        let executor = TradeExecutor::new(symbol.clone());
        let stake_state = StakeState::new(config.staking.initial_stake);
        Self {
            symbol,
            config,
            connector,
            reversal,
            executor,
            stake_state,
            state: CycleState::Disconnected,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Snapshot of the staking state; the owning task is the only
    /// writer.
    pub fn stake_state(&self) -> StakeState {
        self.stake_state
    }

    /// Loop forever, backing off on errors and idling between quiet
    /// cycles. Honors shutdown at the delays between iterations; an
    /// in-flight settlement wait is always drained first.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("🔁 [{}] symbol cycle starting", self.symbol);
        loop {
            if *shutdown.borrow() {
                break;
            }
            let delay = match self.run_once().await {
                Ok(()) => Duration::from_secs(self.config.idle_delay_secs),
                Err(error) => {
                    tracing::error!("[{}] cycle error: {}", self.symbol, error);
                    Duration::from_secs(self.config.backoff_secs)
                }
            };
            if wait_or_shutdown(delay, &mut shutdown).await {
                break;
            }
        }
        tracing::info!("[{}] symbol cycle stopped", self.symbol);
    }

    /// One full iteration of the state machine. Ends back in
    /// `Disconnected` on every path; the session is never reused.
    pub async fn run_once(&mut self) -> Result<()> {
        self.enter(CycleState::Authenticating);
        let mut session = match self.connector.connect(&self.config).await {
            Ok(session) => session,
            Err(error) => {
                self.enter(CycleState::Disconnected);
                return Err(error);
            }
        };
        tracing::info!(
            "✅ [{}] connected | balance: {:.2} {}",
            self.symbol,
            session.balance(),
            self.config.currency
        );

        let result = self.trade_phase(&mut session).await;
        session.close().await;
        self.enter(CycleState::Disconnected);
        result
    }

    async fn trade_phase(&mut self, session: &mut DerivSession) -> Result<()> {
        self.enter(CycleState::Fetching);
        let batch = session
            .fetch_candles(
                &self.symbol,
                self.config.granularity,
                self.config.candle_count,
            )
            .await?;

        self.enter(CycleState::Analyzing);
        let Some(direction) = analyze(&batch.candles, &batch.volumes, &self.reversal) else {
            tracing::debug!(
                "[{}] no signal ({} candles)",
                self.symbol,
                batch.candles.len()
            );
            self.enter(CycleState::Idle);
            return Ok(());
        };

        self.enter(CycleState::Trading);
        let stake = self.config.staking.stake_for(&self.stake_state);
        tracing::info!(
            "[{}] signal {} | stake ${:.2} | step {}",
            self.symbol,
            direction,
            stake,
            self.stake_state.step
        );
        if self
            .executor
            .submit(session, direction, stake, &self.config)
            .await?
            .is_none()
        {
            return Ok(());
        }

        self.enter(CycleState::Settling);
        match self.executor.settle_open(session, &self.config).await {
            Ok(Some(outcome)) => {
                self.stake_state = self.config.staking.settle(&self.stake_state, &outcome);
                if outcome.win {
                    tracing::info!(
                        "✅ [{}] WIN | profit ${:.2} | next stake ${:.2}",
                        self.symbol,
                        outcome.profit,
                        self.config.staking.stake_for(&self.stake_state)
                    );
                } else {
                    tracing::info!(
                        "❌ [{}] LOSS | profit ${:.2} | next stake ${:.2}",
                        self.symbol,
                        outcome.profit,
                        self.config.staking.stake_for(&self.stake_state)
                    );
                }
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(BotError::SettlementTimeout { attempts }) => {
                // Outcome unknown: never counted as a win or a loss
                tracing::warn!(
                    "⚠️ [{}] settlement unconfirmed after {} polls, stake unchanged",
                    self.symbol,
                    attempts
                );
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    fn enter(&mut self, next: CycleState) {
        tracing::trace!("[{}] {:?} -> {:?}", self.symbol, self.state, next);
        self.state = next;
    }
}

/// Sleep that races the shutdown signal. Returns true when shutting
/// down.
async fn wait_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = sleep(delay) => false,
        _ = shutdown.changed() => true,
    }
}
