//! Market identity and lifecycle
//!
//! Markets are created on subscription and destroyed on resolution or
//! unsubscription. Discovery itself is an external collaborator; the engine
//! only needs identity, the two token sides, and resolution status.

use serde::{Deserialize, Serialize};

/// Market identifier (exchange condition id)
pub type MarketId = String;

/// Correlation group identifier
pub type GroupId = String;

/// Token side of a binary market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Yes tokens
    Yes,
    /// No tokens
    No,
}

/// Final outcome of a resolved binary market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Yes,
    No,
}

/// Resolution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketStatus {
    /// Trading, quotes streaming
    Active,
    /// Resolved to an outcome; positions settle at 1 or 0
    Resolved(Outcome),
}

/// A binary YES/NO prediction market known to the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    /// Unique market identifier
    pub id: MarketId,
    /// Resolution status
    pub status: MarketStatus,
}

impl Market {
    /// Register an active market
    pub fn new(id: impl Into<MarketId>) -> Self {
        Self {
            id: id.into(),
            status: MarketStatus::Active,
        }
    }

    /// Whether the market is still trading
    pub fn is_active(&self) -> bool {
        self.status == MarketStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_new_is_active() {
        let market = Market::new("cond-1");
        assert!(market.is_active());
        assert_eq!(market.id, "cond-1");
    }

    #[test]
    fn test_resolved_market_not_active() {
        let mut market = Market::new("cond-1");
        market.status = MarketStatus::Resolved(Outcome::No);
        assert!(!market.is_active());
    }

    #[test]
    fn test_status_serde_round_trip() {
        let status = MarketStatus::Resolved(Outcome::Yes);
        let json = serde_json::to_string(&status).unwrap();
        let back: MarketStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(status, back);
    }
}
