use crate::models::{BodyColor, Candle, ContractType};

/// The reversal pattern itself is symmetric; what direction to trade on
/// it is not. Live variants of this strategy disagree on the mapping, so
/// it is explicit configuration, never a hard-coded constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionMapping {
    /// Bet on the reversal itself: a green run ending in a red candle
    /// emits CALL.
    ReversalFading,
    /// Bet on continuation of the new weakness: a green run ending in a
    /// red candle emits PUT.
    ReversalFollowing,
}

impl DirectionMapping {
    /// Trade direction for a confirmed reversal out of a `trend`-colored
    /// run. A doji run never reverses, so it yields no direction.
    pub fn direction_for(&self, trend: BodyColor) -> Option<ContractType> {
        match (self, trend) {
            (DirectionMapping::ReversalFading, BodyColor::Green) => Some(ContractType::Call),
            (DirectionMapping::ReversalFading, BodyColor::Red) => Some(ContractType::Put),
            (DirectionMapping::ReversalFollowing, BodyColor::Green) => Some(ContractType::Put),
            (DirectionMapping::ReversalFollowing, BodyColor::Red) => Some(ContractType::Call),
            (_, BodyColor::Doji) => None,
        }
    }
}

/// Tuning for the reversal signal.
#[derive(Debug, Clone, Copy)]
pub struct ReversalConfig {
    pub min_candles: usize,
    pub volume_threshold: f64,
    pub mapping: DirectionMapping,
}

/// The pattern needs a run of four plus the reversal candle.
const PATTERN_LEN: usize = 5;

/// Pure reversal-pattern signal: a run of four same-colored candle
/// bodies followed by one opposite-colored body, confirmed by weak
/// volume on the second-to-last candle.
///
/// `volume_history` is the volume list captured for the whole fetch
/// batch; the average of all but its last entry is the weakness
/// baseline.
pub fn analyze(
    candles: &[Candle],
    volume_history: &[f64],
    config: &ReversalConfig,
) -> Option<ContractType> {
    if candles.len() < config.min_candles.max(PATTERN_LEN) {
        return None;
    }

    let window = &candles[candles.len() - PATTERN_LEN..];
    let colors: Vec<BodyColor> = window.iter().map(Candle::body_color).collect();

    let trend = colors[0];
    if !colors[..PATTERN_LEN - 1].iter().all(|c| *c == trend) {
        return None;
    }

    let last = colors[PATTERN_LEN - 1];
    match (trend, last) {
        (BodyColor::Green, BodyColor::Red) | (BodyColor::Red, BodyColor::Green) => {}
        _ => return None,
    }

    let candidate = &candles[candles.len() - 2];
    if !is_weak_volume(candidate.volume, volume_history, config.volume_threshold) {
        return None;
    }

    config.mapping.direction_for(trend)
}

/// A candidate volume is "weak" when it sits below the batch average
/// (excluding the newest entry) scaled by the threshold. No history at
/// all counts as weak: missing data is treated as significant.
fn is_weak_volume(candidate: f64, volume_history: &[f64], threshold: f64) -> bool {
    if volume_history.is_empty() {
        return true;
    }
    let prior = &volume_history[..volume_history.len() - 1];
    let avg = prior.iter().sum::<f64>() / prior.len().max(1) as f64;
    candidate < avg * threshold
}
