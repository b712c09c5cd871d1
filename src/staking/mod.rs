// Stake sizing module
use crate::models::TradeOutcome;

/// How the next stake is derived from the previous outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StakingPolicy {
    /// Stake for an attempt is `initial * multiplier^step`. A loss bumps
    /// the step, a win resets it to zero.
    SteppedMartingale { multiplier: f64 },
    /// Stake is the running amount itself: wins add the realized profit,
    /// a loss resets to the initial stake.
    Compounding,
}

/// Per-symbol staking state. Owned by exactly one symbol task and only
/// rewritten after a confirmed settlement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StakeState {
    pub stake: f64,
    pub step: u32,
}

impl StakeState {
    pub fn new(initial_stake: f64) -> Self {
        Self {
            stake: initial_stake,
            step: 0,
        }
    }
}

/// A staking policy plus its fixed parameters. `stake_for` and `settle`
/// are pure: identical inputs always produce identical outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Staking {
    pub policy: StakingPolicy,
    pub initial_stake: f64,
    pub max_stake: Option<f64>,
}

impl Staking {
    /// Amount to commit for the next attempt, clamped to `[0, max_stake]`.
    pub fn stake_for(&self, state: &StakeState) -> f64 {
        let raw = match self.policy {
            StakingPolicy::SteppedMartingale { multiplier } => {
                self.initial_stake * multiplier.powi(state.step as i32)
            }
            StakingPolicy::Compounding => state.stake,
        };
        self.clamp(raw)
    }

    /// State transition after a settled trade. Never called on a
    /// settlement timeout: an unknown outcome must not move the stake.
    pub fn settle(&self, state: &StakeState, outcome: &TradeOutcome) -> StakeState {
        match (self.policy, outcome.win) {
            (StakingPolicy::SteppedMartingale { .. }, true) => StakeState {
                stake: state.stake,
                step: 0,
            },
            (StakingPolicy::SteppedMartingale { .. }, false) => StakeState {
                stake: state.stake,
                step: state.step + 1,
            },
            (StakingPolicy::Compounding, true) => StakeState {
                stake: self.clamp(state.stake + outcome.profit),
                step: 0,
            },
            (StakingPolicy::Compounding, false) => StakeState {
                stake: self.initial_stake,
                step: 0,
            },
        }
    }

    fn clamp(&self, stake: f64) -> f64 {
        let stake = stake.max(0.0);
        match self.max_stake {
            Some(cap) => stake.min(cap),
            None => stake,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn martingale() -> Staking {
        Staking {
            policy: StakingPolicy::SteppedMartingale { multiplier: 2.05 },
            initial_stake: 0.35,
            max_stake: None,
        }
    }

    fn compounding() -> Staking {
        Staking {
            policy: StakingPolicy::Compounding,
            initial_stake: 0.35,
            max_stake: None,
        }
    }

    #[test]
    fn test_martingale_three_losses_grow_geometrically() {
        let staking = martingale();
        let mut state = StakeState::new(0.35);
        let loss = TradeOutcome::new(-0.35);

        assert_eq!(staking.stake_for(&state), 0.35);
        state = staking.settle(&state, &loss);
        assert!((staking.stake_for(&state) - 0.35 * 2.05).abs() < 1e-9);
        state = staking.settle(&state, &loss);
        assert!((staking.stake_for(&state) - 0.35 * 2.05 * 2.05).abs() < 1e-9);
    }

    #[test]
    fn test_martingale_win_resets_step() {
        let staking = martingale();
        let mut state = StakeState::new(0.35);
        state = staking.settle(&state, &TradeOutcome::new(-0.35));
        state = staking.settle(&state, &TradeOutcome::new(-0.72));
        assert_eq!(state.step, 2);

        state = staking.settle(&state, &TradeOutcome::new(1.10));
        assert_eq!(state.step, 0);
        assert_eq!(staking.stake_for(&state), 0.35);
    }

    #[test]
    fn test_compounding_win_adds_profit() {
        let staking = compounding();
        let state = StakeState::new(0.35);
        let next = staking.settle(&state, &TradeOutcome::new(0.27));
        assert!((next.stake - 0.62).abs() < 1e-9);
        assert!((staking.stake_for(&next) - 0.62).abs() < 1e-9);
    }

    #[test]
    fn test_compounding_loss_resets_to_initial() {
        let staking = compounding();
        let state = StakeState {
            stake: 4.20,
            step: 0,
        };
        let next = staking.settle(&state, &TradeOutcome::new(-4.20));
        assert_eq!(next.stake, 0.35);
    }

    #[test]
    fn test_settle_is_pure() {
        let staking = martingale();
        let state = StakeState { stake: 0.35, step: 3 };
        let outcome = TradeOutcome::new(-0.35);
        assert_eq!(
            staking.settle(&state, &outcome),
            staking.settle(&state, &outcome)
        );
        assert_eq!(staking.stake_for(&state), staking.stake_for(&state));
    }

    #[test]
    fn test_max_stake_caps_martingale_growth() {
        let staking = Staking {
            max_stake: Some(5.0),
            ..martingale()
        };
        let state = StakeState { stake: 0.35, step: 10 };
        // 0.35 * 2.05^10 is far past the cap
        assert_eq!(staking.stake_for(&state), 5.0);
    }

    #[test]
    fn test_stake_is_clamped_to_the_floor() {
        let staking = compounding();
        assert_eq!(staking.clamp(-1.0), 0.0);
        // A "win" carrying a negative adjustment cannot push below zero
        let state = StakeState { stake: 0.10, step: 0 };
        let next = staking.settle(&state, &TradeOutcome { profit: -0.50, win: true });
        assert_eq!(next.stake, 0.0);
    }
}
