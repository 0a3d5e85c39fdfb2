//! Baseline price tracking
//!
//! Maintains an exponentially decayed reference price and variance per
//! market. Constant memory per market: only the running estimates are kept,
//! never a price history.

use crate::feed::OrderBookSnapshot;
use crate::market::{MarketId, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for baseline tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// Half-life of the exponential decay, in seconds
    pub decay_half_life_secs: u64,
    /// Samples required before the baseline is considered valid
    pub warmup_samples: u64,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            decay_half_life_secs: 300,
            warmup_samples: 20,
        }
    }
}

/// Decayed reference price state for one market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineState {
    /// Decayed reference price (YES mid)
    pub price: Decimal,
    /// Decayed variance of the price around the reference
    pub variance: Decimal,
    /// Ticks absorbed since creation or last reset
    pub samples: u64,
    /// Timestamp of the last absorbed tick
    pub updated_at: DateTime<Utc>,
}

impl BaselineState {
    fn seed(price: Decimal, at: DateTime<Utc>) -> Self {
        Self {
            price,
            variance: Decimal::ZERO,
            samples: 1,
            updated_at: at,
        }
    }

    /// Rolling volatility estimate (standard deviation of the decayed variance)
    pub fn volatility(&self) -> Decimal {
        let var: f64 = self.variance.try_into().unwrap_or(0.0);
        Decimal::try_from(var.max(0.0).sqrt()).unwrap_or(Decimal::ZERO)
    }
}

/// Tracks decayed reference prices across markets
///
/// `get` returns `None` until the warm-up sample count is reached, which
/// signals downstream consumers to suppress decisions. On a feed gap the
/// affected market is reset and must re-warm rather than extrapolating
/// across the discontinuity.
pub struct BaselineTracker {
    config: BaselineConfig,
    states: HashMap<MarketId, BaselineState>,
}

impl BaselineTracker {
    /// Create a tracker with the given configuration
    pub fn new(config: BaselineConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
        }
    }

    /// Absorb a tick; snapshots with no usable quote are skipped
    pub fn update(&mut self, snapshot: &OrderBookSnapshot) {
        let Some(price) = snapshot.yes_mid().or_else(|| snapshot.best_bid(Side::Yes)) else {
            return;
        };

        self.states
            .entry(snapshot.market_id.clone())
            .and_modify(|s| {
                let dt = (snapshot.timestamp - s.updated_at)
                    .num_milliseconds()
                    .max(0) as f64
                    / 1000.0;
                let alpha = decay_alpha(dt, self.config.decay_half_life_secs);

                let diff = price - s.price;
                s.price += alpha * diff;
                // EWMA variance of deviations from the decayed reference
                s.variance = (Decimal::ONE - alpha) * (s.variance + alpha * diff * diff);
                s.samples += 1;
                s.updated_at = snapshot.timestamp;
            })
            .or_insert_with(|| BaselineState::seed(price, snapshot.timestamp));
    }

    /// Get the baseline for a market, `None` until warm
    pub fn get(&self, market_id: &str) -> Option<&BaselineState> {
        self.states
            .get(market_id)
            .filter(|s| s.samples >= self.config.warmup_samples)
    }

    /// Whether a market has an established (warm) baseline
    pub fn is_warm(&self, market_id: &str) -> bool {
        self.get(market_id).is_some()
    }

    /// Drop state for a market so it re-warms from scratch
    pub fn reset(&mut self, market_id: &str) {
        self.states.remove(market_id);
    }

    /// Drop state for a resolved or unsubscribed market
    pub fn remove(&mut self, market_id: &str) {
        self.states.remove(market_id);
    }
}

/// EWMA smoothing factor for an elapsed interval and half-life
fn decay_alpha(dt_secs: f64, half_life_secs: u64) -> Decimal {
    if half_life_secs == 0 {
        return Decimal::ONE;
    }
    let alpha = 1.0 - 0.5_f64.powf(dt_secs / half_life_secs as f64);
    Decimal::try_from(alpha.clamp(0.0, 1.0)).unwrap_or(Decimal::ONE)
}
