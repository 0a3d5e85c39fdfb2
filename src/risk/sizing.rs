//! Position sizing policies
//!
//! Sizing is pluggable: fixed-size (default) or a fractional policy driven
//! by the spike's estimated edge and the baseline volatility. The exact
//! formula is a configuration choice, not engine logic.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::baseline::BaselineState;
use crate::config::{SizingConfig, SizingMode};
use crate::spike::SpikeEvent;

/// Trait for position sizing implementations
pub trait PositionSizer: Send + Sync {
    /// Candidate size in dollars for a spike, bounded by the per-position cap
    fn size(&self, spike: &SpikeEvent, baseline: &BaselineState, cap: Decimal) -> Decimal;

    /// Sizing mode name for logs
    fn mode_name(&self) -> &'static str;
}

/// Fixed-size policy (default)
///
/// Every approved candidate gets the same dollar size, clamped to the
/// per-position cap.
#[derive(Debug, Clone)]
pub struct FixedSizer {
    /// Dollar size per position
    pub size: Decimal,
}

impl FixedSizer {
    pub fn new(size: Decimal) -> Self {
        Self { size }
    }
}

impl Default for FixedSizer {
    fn default() -> Self {
        Self { size: dec!(100) }
    }
}

impl PositionSizer for FixedSizer {
    fn size(&self, _spike: &SpikeEvent, _baseline: &BaselineState, cap: Decimal) -> Decimal {
        self.size.min(cap)
    }

    fn mode_name(&self) -> &'static str {
        "fixed"
    }
}

/// Fractional-edge policy (Kelly-style heuristic)
///
/// Scales a fraction of the cap by the ratio of spike magnitude (edge
/// estimate) to baseline volatility, then by the event's confidence score:
/// larger dislocations against a calm baseline get more size, weaker signals
/// get less. This is a documented heuristic, not a Kelly derivation; the
/// volatility floor keeps the ratio bounded on quiet books.
#[derive(Debug, Clone)]
pub struct FractionalEdgeSizer {
    /// Base fraction of the cap at edge == volatility floor
    pub fraction: Decimal,
    /// Lower bound applied to the volatility estimate
    pub volatility_floor: Decimal,
    /// Minimum viable order size
    pub min_size: Decimal,
}

impl Default for FractionalEdgeSizer {
    fn default() -> Self {
        Self {
            fraction: dec!(0.25),
            volatility_floor: dec!(0.05),
            min_size: dec!(10),
        }
    }
}

impl PositionSizer for FractionalEdgeSizer {
    fn size(&self, spike: &SpikeEvent, baseline: &BaselineState, cap: Decimal) -> Decimal {
        let vol = baseline.volatility().max(self.volatility_floor);
        let edge_ratio = spike.magnitude / vol;
        let raw = cap * self.fraction * edge_ratio * spike.confidence;
        raw.clamp(self.min_size, cap)
    }

    fn mode_name(&self) -> &'static str {
        "fractional_edge"
    }
}

/// Build the configured sizing policy
pub fn create_sizer(config: &SizingConfig) -> Box<dyn PositionSizer> {
    match config.mode {
        SizingMode::Fixed => Box::new(FixedSizer::new(config.fixed_size)),
        SizingMode::FractionalEdge => Box::new(FractionalEdgeSizer {
            fraction: config.edge_fraction,
            volatility_floor: config.volatility_floor,
            min_size: config.min_size,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spike::SpikeDirection;
    use chrono::Utc;

    fn spike(magnitude: Decimal) -> SpikeEvent {
        SpikeEvent {
            market_id: "m1".to_string(),
            direction: SpikeDirection::YesSpike,
            magnitude,
            fired_threshold: dec!(0.15),
            baseline_price: dec!(0.30),
            observed_price: dec!(0.30) + magnitude,
            sweep_size: dec!(1000),
            confidence: dec!(0.8),
            timestamp: Utc::now(),
        }
    }

    fn baseline(variance: Decimal) -> BaselineState {
        BaselineState {
            price: dec!(0.30),
            variance,
            samples: 100,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_fixed_sizer_constant() {
        let sizer = FixedSizer::default();
        let size = sizer.size(&spike(dec!(0.25)), &baseline(dec!(0.0004)), dec!(100));
        assert_eq!(size, dec!(100));
    }

    #[test]
    fn test_fixed_sizer_clamped_to_cap() {
        let sizer = FixedSizer::new(dec!(500));
        let size = sizer.size(&spike(dec!(0.25)), &baseline(dec!(0.0004)), dec!(100));
        assert_eq!(size, dec!(100));
    }

    #[test]
    fn test_fractional_edge_scales_with_magnitude() {
        let sizer = FractionalEdgeSizer::default();
        let base = baseline(dec!(0.0004)); // vol 0.02, floored to 0.05
        let small = sizer.size(&spike(dec!(0.16)), &base, dec!(100));
        let large = sizer.size(&spike(dec!(0.40)), &base, dec!(100));
        assert!(large >= small);
        assert!(large <= dec!(100));
    }

    #[test]
    fn test_fractional_edge_shrinks_in_noise() {
        let sizer = FractionalEdgeSizer::default();
        let calm = sizer.size(&spike(dec!(0.20)), &baseline(dec!(0.0004)), dec!(100));
        // vol = 0.3 for variance 0.09
        let noisy = sizer.size(&spike(dec!(0.20)), &baseline(dec!(0.09)), dec!(100));
        assert!(noisy < calm);
    }

    #[test]
    fn test_fractional_edge_scales_with_confidence() {
        let sizer = FractionalEdgeSizer::default();
        let base = baseline(dec!(0.0004));

        let weak = SpikeEvent {
            confidence: dec!(0.4),
            ..spike(dec!(0.20))
        };
        let strong = SpikeEvent {
            confidence: dec!(1),
            ..spike(dec!(0.20))
        };
        assert!(sizer.size(&weak, &base, dec!(100)) < sizer.size(&strong, &base, dec!(100)));
    }

    #[test]
    fn test_fractional_edge_respects_bounds() {
        let sizer = FractionalEdgeSizer::default();
        let tiny = sizer.size(&spike(dec!(0.001)), &baseline(dec!(0.09)), dec!(100));
        assert_eq!(tiny, dec!(10)); // min_size
        let huge = sizer.size(&spike(dec!(0.90)), &baseline(dec!(0.000001)), dec!(100));
        assert_eq!(huge, dec!(100)); // cap
    }

    #[test]
    fn test_create_sizer_modes() {
        let fixed = create_sizer(&SizingConfig::default());
        assert_eq!(fixed.mode_name(), "fixed");

        let config = SizingConfig {
            mode: SizingMode::FractionalEdge,
            ..SizingConfig::default()
        };
        assert_eq!(create_sizer(&config).mode_name(), "fractional_edge");
    }
}
