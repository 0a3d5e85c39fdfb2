//! Spike event types

use crate::market::{MarketId, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a detected spike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpikeDirection {
    /// YES bid jumped above baseline; fade by buying NO
    YesSpike,
    /// YES bid dropped below baseline; fade by buying YES
    NoSpike,
}

impl SpikeDirection {
    /// Token side the fade position is taken on
    pub fn fade_side(self) -> Side {
        match self {
            SpikeDirection::YesSpike => Side::No,
            SpikeDirection::NoSpike => Side::Yes,
        }
    }
}

/// A detected liquidity-driven price spike
///
/// Ephemeral: consumed by the decision pipeline in the same event cycle,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpikeEvent {
    /// Market the spike occurred in
    pub market_id: MarketId,
    /// Spike direction
    pub direction: SpikeDirection,
    /// Absolute deviation of YES best bid from baseline
    pub magnitude: Decimal,
    /// Threshold that was in effect when the event fired
    pub fired_threshold: Decimal,
    /// Baseline reference price at detection time
    pub baseline_price: Decimal,
    /// YES best bid that triggered the event
    pub observed_price: Decimal,
    /// Estimated displayed liquidity consumed to move price this far
    pub sweep_size: Decimal,
    /// Signal quality score in [0, 1]
    pub confidence: Decimal,
    /// Detection timestamp
    pub timestamp: DateTime<Utc>,
}
