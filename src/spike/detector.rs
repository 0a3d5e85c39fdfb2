//! Spike detection
//!
//! Compares the live top of book to the decayed baseline and fires a
//! classified event when the deviation clears both the price threshold and
//! the minimum sweep size. The dual condition separates genuine whale-driven
//! sweeps from ordinary drift and thin-book noise.

use crate::baseline::BaselineState;
use crate::feed::OrderBookSnapshot;
use crate::market::{MarketId, Side};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::types::{SpikeDirection, SpikeEvent};

/// Configuration for spike detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikeConfig {
    /// Floor on deviation before any event fires
    pub absolute_threshold: Decimal,
    /// Deviation must also exceed this multiple of baseline volatility
    pub reactivity_multiplier: Decimal,
    /// Minimum estimated sweep size (displayed liquidity consumed)
    pub min_sweep_size: Decimal,
    /// Minimum confidence score before an event fires
    pub min_confidence: Decimal,
    /// Per-market cooldown after firing, in seconds
    pub cooldown_secs: u64,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            absolute_threshold: dec!(0.15),
            reactivity_multiplier: dec!(3),
            min_sweep_size: dec!(500),
            min_confidence: dec!(0.5),
            cooldown_secs: 300,
        }
    }
}

/// Detects liquidity-driven spikes against the baseline
pub struct SpikeDetector {
    config: SpikeConfig,
    cooldown: Duration,
    /// Last firing time per market, for cooldown enforcement
    last_fired: HashMap<MarketId, DateTime<Utc>>,
    /// Previous snapshot per market, for sweep-size estimation
    prev_book: HashMap<MarketId, OrderBookSnapshot>,
}

impl SpikeDetector {
    /// Create a detector with the given configuration
    pub fn new(config: SpikeConfig) -> Self {
        let cooldown = Duration::seconds(config.cooldown_secs as i64);
        Self {
            config,
            cooldown,
            last_fired: HashMap::new(),
            prev_book: HashMap::new(),
        }
    }

    /// The effective firing threshold for a given baseline
    pub fn effective_threshold(&self, baseline: &BaselineState) -> Decimal {
        self.config
            .absolute_threshold
            .max(self.config.reactivity_multiplier * baseline.volatility())
    }

    /// Evaluate a tick against the baseline
    ///
    /// Returns an event only when deviation exceeds the effective threshold,
    /// the implied sweep clears the minimum, and the market is out of
    /// cooldown. The snapshot is always recorded for the next sweep estimate.
    pub fn evaluate(
        &mut self,
        snapshot: &OrderBookSnapshot,
        baseline: &BaselineState,
    ) -> Option<SpikeEvent> {
        let result = self.check(snapshot, baseline);
        self.prev_book
            .insert(snapshot.market_id.clone(), snapshot.clone());
        result
    }

    fn check(
        &mut self,
        snapshot: &OrderBookSnapshot,
        baseline: &BaselineState,
    ) -> Option<SpikeEvent> {
        let now = snapshot.timestamp;

        // Cooldown: one event per underlying sweep, even if deviation persists
        if let Some(last) = self.last_fired.get(&snapshot.market_id) {
            if now - *last < self.cooldown {
                return None;
            }
        }

        let bid = snapshot.best_bid(Side::Yes)?;
        let deviation = (bid - baseline.price).abs();
        let threshold = self.effective_threshold(baseline);
        if deviation <= threshold {
            return None;
        }

        let direction = if bid > baseline.price {
            SpikeDirection::YesSpike
        } else {
            SpikeDirection::NoSpike
        };

        let sweep = self.estimate_sweep(snapshot, direction);
        if sweep < self.config.min_sweep_size {
            tracing::debug!(
                market_id = %snapshot.market_id,
                %deviation,
                %sweep,
                "Deviation over threshold but sweep too small, ignoring"
            );
            return None;
        }

        let confidence = self.score_confidence(snapshot, direction, deviation, sweep);
        if confidence < self.config.min_confidence {
            // A weak signal costs no cooldown; a stronger tick may still fire
            tracing::debug!(
                market_id = %snapshot.market_id,
                %confidence,
                min_confidence = %self.config.min_confidence,
                "Spike over threshold but confidence too low, ignoring"
            );
            return None;
        }

        self.last_fired.insert(snapshot.market_id.clone(), now);
        tracing::info!(
            market_id = %snapshot.market_id,
            ?direction,
            %deviation,
            %threshold,
            %sweep,
            %confidence,
            "Spike detected"
        );

        Some(SpikeEvent {
            market_id: snapshot.market_id.clone(),
            direction,
            magnitude: deviation,
            fired_threshold: threshold,
            baseline_price: baseline.price,
            observed_price: bid,
            sweep_size: sweep,
            confidence,
            timestamp: now,
        })
    }

    /// Estimate the displayed liquidity consumed since the previous snapshot
    ///
    /// An up-spike lifts ask levels below the new best ask; a down-spike hits
    /// bid levels above the new best bid. With no prior snapshot the estimate
    /// is zero, which keeps the detector quiet until it has context.
    fn estimate_sweep(&self, snapshot: &OrderBookSnapshot, direction: SpikeDirection) -> Decimal {
        let Some(prev) = self.prev_book.get(&snapshot.market_id) else {
            return Decimal::ZERO;
        };

        match direction {
            SpikeDirection::YesSpike => {
                let new_ask = snapshot
                    .best_ask(Side::Yes)
                    .unwrap_or(Decimal::ONE);
                prev.yes_asks
                    .iter()
                    .filter(|l| l.price < new_ask)
                    .map(|l| l.size)
                    .sum()
            }
            SpikeDirection::NoSpike => {
                let new_bid = snapshot
                    .best_bid(Side::Yes)
                    .unwrap_or(Decimal::ZERO);
                prev.yes_bids
                    .iter()
                    .filter(|l| l.price > new_bid)
                    .map(|l| l.size)
                    .sum()
            }
        }
    }

    /// Signal quality score from magnitude, sweep size, and fade entry price
    fn score_confidence(
        &self,
        snapshot: &OrderBookSnapshot,
        direction: SpikeDirection,
        magnitude: Decimal,
        sweep: Decimal,
    ) -> Decimal {
        let mut score = if magnitude >= dec!(0.30) {
            dec!(0.4)
        } else if magnitude >= dec!(0.20) {
            dec!(0.3)
        } else {
            dec!(0.2)
        };

        score += if sweep >= dec!(10000) {
            dec!(0.3)
        } else if sweep >= dec!(5000) {
            dec!(0.2)
        } else {
            dec!(0.1)
        };

        // Cheaper fade-side entry means better risk/reward on reversion
        let entry = snapshot
            .best_ask(direction.fade_side())
            .unwrap_or(Decimal::ONE);
        score += if entry <= dec!(0.30) {
            dec!(0.3)
        } else if entry <= dec!(0.50) {
            dec!(0.2)
        } else {
            dec!(0.1)
        };

        score.min(Decimal::ONE)
    }

    /// Record a snapshot for sweep estimation without evaluating
    ///
    /// Called for ticks the pipeline does not act on (an order or position is
    /// open, or the baseline is re-warming), so the next real evaluation
    /// estimates the sweep against the latest book rather than a stale one.
    pub fn observe(&mut self, snapshot: &OrderBookSnapshot) {
        self.prev_book
            .insert(snapshot.market_id.clone(), snapshot.clone());
    }

    /// Whether the market is currently inside its cooldown window
    pub fn in_cooldown(&self, market_id: &str, now: DateTime<Utc>) -> bool {
        self.last_fired
            .get(market_id)
            .is_some_and(|last| now - *last < self.cooldown)
    }

    /// Drop per-market detector state (feed gap or unsubscription)
    pub fn reset(&mut self, market_id: &str) {
        self.prev_book.remove(market_id);
        self.last_fired.remove(market_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::PriceLevel;

    fn baseline(price: Decimal, variance: Decimal) -> BaselineState {
        BaselineState {
            price,
            variance,
            samples: 100,
            updated_at: Utc::now(),
        }
    }

    fn snap(seq: u64, ts: DateTime<Utc>, bid: Decimal, ask: Decimal, size: Decimal) -> OrderBookSnapshot {
        OrderBookSnapshot {
            market_id: "m1".to_string(),
            seq,
            timestamp: ts,
            yes_bids: vec![PriceLevel::new(bid, size)],
            yes_asks: vec![PriceLevel::new(ask, size)],
        }
    }

    fn detector() -> SpikeDetector {
        SpikeDetector::new(SpikeConfig {
            absolute_threshold: dec!(0.15),
            reactivity_multiplier: dec!(3),
            min_sweep_size: dec!(100),
            min_confidence: dec!(0.5),
            cooldown_secs: 300,
        })
    }

    #[test]
    fn test_effective_threshold_takes_max() {
        let det = detector();
        // volatility 0.02 -> 3 * 0.02 = 0.06 < 0.15
        let calm = baseline(dec!(0.30), dec!(0.0004));
        assert_eq!(det.effective_threshold(&calm), dec!(0.15));

        // volatility 0.10 -> 3 * 0.10 = 0.30 > 0.15
        let noisy = baseline(dec!(0.30), dec!(0.01));
        assert!(det.effective_threshold(&noisy) > dec!(0.15));
    }

    #[test]
    fn test_spike_fires_with_sweep() {
        let mut det = detector();
        let base = baseline(dec!(0.30), dec!(0.0004));
        let now = Utc::now();

        // Prior book with ask liquidity that gets swept
        assert!(det.evaluate(&snap(1, now, dec!(0.30), dec!(0.32), dec!(800)), &base).is_none());

        // Best bid jumps to 0.55: deviation 0.25 > 0.15
        let event = det
            .evaluate(
                &snap(2, now + Duration::seconds(1), dec!(0.55), dec!(0.57), dec!(200)),
                &base,
            )
            .expect("spike should fire");

        assert_eq!(event.direction, SpikeDirection::YesSpike);
        assert_eq!(event.magnitude, dec!(0.25));
        assert_eq!(event.fired_threshold, dec!(0.15));
        assert_eq!(event.sweep_size, dec!(800));
    }

    #[test]
    fn test_no_event_below_threshold() {
        let mut det = detector();
        let base = baseline(dec!(0.30), dec!(0.0004));
        let now = Utc::now();

        assert!(det.evaluate(&snap(1, now, dec!(0.30), dec!(0.32), dec!(800)), &base).is_none());
        // Deviation 0.10 < 0.15
        let event = det.evaluate(
            &snap(2, now + Duration::seconds(1), dec!(0.40), dec!(0.42), dec!(200)),
            &base,
        );
        assert!(event.is_none());
    }

    #[test]
    fn test_no_event_without_sweep() {
        let mut det = SpikeDetector::new(SpikeConfig {
            min_sweep_size: dec!(1000),
            ..SpikeConfig::default()
        });
        let base = baseline(dec!(0.30), dec!(0.0004));
        let now = Utc::now();

        // Thin prior book: only 50 displayed on the ask
        assert!(det.evaluate(&snap(1, now, dec!(0.30), dec!(0.32), dec!(50)), &base).is_none());
        let event = det.evaluate(
            &snap(2, now + Duration::seconds(1), dec!(0.55), dec!(0.57), dec!(50)),
            &base,
        );
        assert!(event.is_none(), "thin-book move must not fire");
    }

    #[test]
    fn test_first_tick_never_fires() {
        let mut det = detector();
        let base = baseline(dec!(0.30), dec!(0.0004));
        // No prior snapshot, sweep estimate is zero
        let event = det.evaluate(&snap(1, Utc::now(), dec!(0.55), dec!(0.57), dec!(500)), &base);
        assert!(event.is_none());
    }

    #[test]
    fn test_cooldown_suppresses_repeat() {
        let mut det = detector();
        let base = baseline(dec!(0.30), dec!(0.0004));
        let now = Utc::now();

        assert!(det.evaluate(&snap(1, now, dec!(0.30), dec!(0.32), dec!(800)), &base).is_none());
        let first = det.evaluate(
            &snap(2, now + Duration::seconds(1), dec!(0.55), dec!(0.57), dec!(800)),
            &base,
        );
        assert!(first.is_some());

        // Deviation persists but cooldown is active
        let second = det.evaluate(
            &snap(3, now + Duration::seconds(2), dec!(0.56), dec!(0.58), dec!(800)),
            &base,
        );
        assert!(second.is_none());
        assert!(det.in_cooldown("m1", now + Duration::seconds(2)));

        // After the window the market can fire again
        let later = now + Duration::seconds(301);
        assert!(!det.in_cooldown("m1", later));
        let third = det.evaluate(&snap(4, later, dec!(0.56), dec!(0.58), dec!(800)), &base);
        assert!(third.is_some());
    }

    #[test]
    fn test_down_spike_direction() {
        let mut det = detector();
        let base = baseline(dec!(0.60), dec!(0.0004));
        let now = Utc::now();

        assert!(det.evaluate(&snap(1, now, dec!(0.60), dec!(0.62), dec!(800)), &base).is_none());
        let event = det
            .evaluate(
                &snap(2, now + Duration::seconds(1), dec!(0.35), dec!(0.37), dec!(200)),
                &base,
            )
            .expect("down spike should fire");

        assert_eq!(event.direction, SpikeDirection::NoSpike);
        assert_eq!(event.direction.fade_side(), Side::Yes);
    }

    #[test]
    fn test_reactivity_multiplier_raises_threshold() {
        let mut det = detector();
        // High volatility: vol = 0.1, threshold = 0.30
        let noisy = baseline(dec!(0.30), dec!(0.01));
        let now = Utc::now();

        assert!(det.evaluate(&snap(1, now, dec!(0.30), dec!(0.32), dec!(800)), &noisy).is_none());
        // Deviation 0.25 clears the absolute floor but not 3 * vol
        let event = det.evaluate(
            &snap(2, now + Duration::seconds(1), dec!(0.55), dec!(0.57), dec!(200)),
            &noisy,
        );
        assert!(event.is_none());
    }

    #[test]
    fn test_reset_clears_cooldown_and_history() {
        let mut det = detector();
        let base = baseline(dec!(0.30), dec!(0.0004));
        let now = Utc::now();

        assert!(det.evaluate(&snap(1, now, dec!(0.30), dec!(0.32), dec!(800)), &base).is_none());
        det.evaluate(&snap(2, now + Duration::seconds(1), dec!(0.55), dec!(0.57), dec!(800)), &base)
            .expect("fires");

        det.reset("m1");
        assert!(!det.in_cooldown("m1", now + Duration::seconds(2)));
        // History gone: next evaluation has no sweep context and stays quiet
        let event = det.evaluate(
            &snap(3, now + Duration::seconds(2), dec!(0.56), dec!(0.58), dec!(800)),
            &base,
        );
        assert!(event.is_none());
    }

    #[test]
    fn test_low_confidence_suppressed_without_cooldown() {
        let mut det = SpikeDetector::new(SpikeConfig {
            min_sweep_size: dec!(100),
            min_confidence: dec!(0.9),
            ..SpikeConfig::default()
        });
        let base = baseline(dec!(0.30), dec!(0.0004));
        let now = Utc::now();

        assert!(det.evaluate(&snap(1, now, dec!(0.30), dec!(0.32), dec!(800)), &base).is_none());
        // Deviation 0.25 and sweep 800 both clear, but the score lands at
        // 0.3 + 0.1 + 0.2 = 0.6 < 0.9
        let event = det.evaluate(
            &snap(2, now + Duration::seconds(1), dec!(0.55), dec!(0.57), dec!(200)),
            &base,
        );
        assert!(event.is_none());
        // A weak signal must not consume the cooldown window
        assert!(!det.in_cooldown("m1", now + Duration::seconds(1)));
    }

    #[test]
    fn test_observe_refreshes_sweep_context() {
        let mut det = detector();
        let base = baseline(dec!(0.30), dec!(0.0004));
        let now = Utc::now();

        // The book is only observed, never evaluated, before the spike
        det.observe(&snap(1, now, dec!(0.30), dec!(0.32), dec!(800)));
        let event = det
            .evaluate(
                &snap(2, now + Duration::seconds(1), dec!(0.55), dec!(0.57), dec!(200)),
                &base,
            )
            .expect("observed book provides sweep context");
        assert_eq!(event.sweep_size, dec!(800));
    }

    #[test]
    fn test_confidence_in_unit_range() {
        let mut det = detector();
        let base = baseline(dec!(0.30), dec!(0.0004));
        let now = Utc::now();

        assert!(det.evaluate(&snap(1, now, dec!(0.30), dec!(0.32), dec!(20000)), &base).is_none());
        let event = det
            .evaluate(&snap(2, now + Duration::seconds(1), dec!(0.65), dec!(0.67), dec!(200)), &base)
            .unwrap();
        assert!(event.confidence > dec!(0));
        assert!(event.confidence <= dec!(1));
    }
}
