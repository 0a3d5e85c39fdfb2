//! Portfolio risk budget

use crate::market::{GroupId, MarketId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A set of markets believed to share a common outcome driver
///
/// Aggregate exposure across the group is capped, so five positions on the
/// same underlying event cannot stack up to five independent bets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationGroup {
    /// Group identifier
    pub id: GroupId,
    /// Aggregate exposure cap for the group
    pub exposure_cap: Decimal,
    /// Member market ids
    pub markets: Vec<MarketId>,
}

/// Process-wide risk budget, single authority for exposure limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskBudget {
    /// Maximum simultaneously open positions
    #[serde(default = "default_max_concurrent_positions")]
    pub max_concurrent_positions: usize,
    /// Maximum size per position, in dollars
    #[serde(default = "default_max_position_size")]
    pub max_position_size: Decimal,
    /// Correlation groups with per-group exposure caps
    #[serde(default)]
    pub groups: Vec<CorrelationGroup>,
}

fn default_max_concurrent_positions() -> usize {
    5
}
fn default_max_position_size() -> Decimal {
    dec!(100)
}

impl Default for RiskBudget {
    fn default() -> Self {
        Self {
            max_concurrent_positions: 5,
            max_position_size: dec!(100),
            groups: vec![],
        }
    }
}

impl RiskBudget {
    /// The correlation group a market belongs to, if any
    pub fn group_of(&self, market_id: &str) -> Option<&CorrelationGroup> {
        self.groups
            .iter()
            .find(|g| g.markets.iter().any(|m| m == market_id))
    }

    /// Markets that appear in more than one group (a configuration error)
    pub fn overlapping_markets(&self) -> Vec<MarketId> {
        let mut seen: Vec<&MarketId> = vec![];
        let mut overlapping = vec![];
        for group in &self.groups {
            for market in &group.markets {
                if seen.contains(&market) && !overlapping.contains(market) {
                    overlapping.push(market.clone());
                }
                seen.push(market);
            }
        }
        overlapping
    }
}
