//! Configuration types for sweepfade

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::baseline::BaselineConfig;
use crate::execution::PlacementConfig;
use crate::ledger::LedgerConfig;
use crate::risk::RiskBudget;
use crate::spike::SpikeConfig;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Market ids to trade
    pub markets: Vec<String>,
    pub feed: FeedConfig,
    pub baseline: BaselineConfig,
    pub spike: SpikeConfig,
    pub risk: RiskBudget,
    pub sizing: SizingConfig,
    pub orders: PlacementConfig,
    pub ledger: LedgerConfig,
    pub execution: ExecutionConfig,
    pub telemetry: TelemetryConfig,
}

/// Feed intake configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Snapshots older than this are ignored for decisions
    pub stale_after_secs: u64,
    /// Per-market event channel capacity
    pub channel_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: 5,
            channel_capacity: 1024,
        }
    }
}

/// Execution mode: paper trading or live
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Paper,
    Live,
}

/// Execution gateway configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub mode: ExecutionMode,
    /// Simulated fill latency in paper mode
    pub paper_fill_delay_ms: u64,
    /// Fraction of each paper order that fills
    pub paper_fill_ratio: Decimal,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Paper,
            paper_fill_delay_ms: 50,
            paper_fill_ratio: Decimal::ONE,
        }
    }
}

/// Sizing mode for position sizing
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    #[default]
    Fixed,
    FractionalEdge,
}

/// Position sizing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Sizing mode: "fixed" or "fractional_edge"
    pub mode: SizingMode,
    /// Dollar size per position (fixed mode)
    pub fixed_size: Decimal,
    /// Base fraction of the cap (fractional_edge mode)
    pub edge_fraction: Decimal,
    /// Volatility floor for the edge ratio (fractional_edge mode)
    pub volatility_floor: Decimal,
    /// Minimum viable order size (fractional_edge mode)
    pub min_size: Decimal,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            mode: SizingMode::Fixed,
            fixed_size: dec!(100),
            edge_fraction: dec!(0.25),
            volatility_floor: dec!(0.05),
            min_size: dec!(10),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub metrics_enabled: bool,
    pub metrics_port: u16,
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            metrics_port: 9090,
            log_level: "info".to_string(),
        }
    }
}

/// Fatal configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no markets configured")]
    NoMarkets,
    #[error("baseline.decay_half_life_secs must be positive")]
    ZeroHalfLife,
    #[error("spike.absolute_threshold must be positive, got {0}")]
    NonPositiveThreshold(Decimal),
    #[error("spike.reactivity_multiplier must not be negative, got {0}")]
    NegativeMultiplier(Decimal),
    #[error("spike.min_confidence must be within [0, 1], got {0}")]
    ConfidenceOutOfRange(Decimal),
    #[error("orders.tick_size must be positive, got {0}")]
    NonPositiveTick(Decimal),
    #[error("risk.max_concurrent_positions must be positive")]
    ZeroPositionCap,
    #[error("risk.max_position_size must be positive, got {0}")]
    NonPositiveSizeCap(Decimal),
    #[error("markets in more than one correlation group: {0:?}")]
    OverlappingGroups(Vec<String>),
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run safely with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.markets.is_empty() {
            return Err(ConfigError::NoMarkets);
        }
        if self.baseline.decay_half_life_secs == 0 {
            return Err(ConfigError::ZeroHalfLife);
        }
        if self.spike.absolute_threshold <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveThreshold(
                self.spike.absolute_threshold,
            ));
        }
        if self.spike.reactivity_multiplier < Decimal::ZERO {
            return Err(ConfigError::NegativeMultiplier(
                self.spike.reactivity_multiplier,
            ));
        }
        if self.spike.min_confidence < Decimal::ZERO || self.spike.min_confidence > Decimal::ONE {
            return Err(ConfigError::ConfidenceOutOfRange(self.spike.min_confidence));
        }
        if self.orders.tick_size <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveTick(self.orders.tick_size));
        }
        if self.risk.max_concurrent_positions == 0 {
            return Err(ConfigError::ZeroPositionCap);
        }
        if self.risk.max_position_size <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveSizeCap(self.risk.max_position_size));
        }
        let overlapping = self.risk.overlapping_markets();
        if !overlapping.is_empty() {
            return Err(ConfigError::OverlappingGroups(overlapping));
        }
        Ok(())
    }
}
