//! Feed types
//!
//! Sequenced order book snapshots as delivered by the (external) market-data
//! collaborator. Snapshots are immutable values, replaced on every tick.

use crate::market::{MarketId, Side};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price level in the order book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Price at this level
    pub price: Decimal,
    /// Total displayed size
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// Order book snapshot for one market
///
/// Levels are quoted on the YES token; NO-side quotes are derived by
/// complement (a NO bid at `p` is a YES ask at `1 - p`). `seq` increases
/// monotonically per market; a gap means the feed dropped deltas and the
/// baseline must re-warm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Market this book belongs to
    pub market_id: MarketId,
    /// Monotonically increasing sequence number
    pub seq: u64,
    /// Exchange timestamp
    pub timestamp: DateTime<Utc>,
    /// YES bid levels, best (highest) first
    pub yes_bids: Vec<PriceLevel>,
    /// YES ask levels, best (lowest) first
    pub yes_asks: Vec<PriceLevel>,
}

impl OrderBookSnapshot {
    /// Best bid for the given token side
    pub fn best_bid(&self, side: Side) -> Option<Decimal> {
        match side {
            Side::Yes => self.yes_bids.first().map(|l| l.price),
            Side::No => self.yes_asks.first().map(|l| Decimal::ONE - l.price),
        }
    }

    /// Best ask for the given token side
    pub fn best_ask(&self, side: Side) -> Option<Decimal> {
        match side {
            Side::Yes => self.yes_asks.first().map(|l| l.price),
            Side::No => self.yes_bids.first().map(|l| Decimal::ONE - l.price),
        }
    }

    /// Mid price on the YES token
    pub fn yes_mid(&self) -> Option<Decimal> {
        match (self.best_bid(Side::Yes), self.best_ask(Side::Yes)) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    /// Displayed bid-side depth at or above `price` on the given side
    ///
    /// This is the liquidity queued ahead of (or alongside) a resting buy at
    /// `price`, used for queue-position estimation.
    pub fn bid_depth_at_or_above(&self, side: Side, price: Decimal) -> Decimal {
        match side {
            Side::Yes => self
                .yes_bids
                .iter()
                .filter(|l| l.price >= price)
                .map(|l| l.size)
                .sum(),
            // NO bids are YES asks mirrored through 1 - p
            Side::No => self
                .yes_asks
                .iter()
                .filter(|l| Decimal::ONE - l.price >= price)
                .map(|l| l.size)
                .sum(),
        }
    }

    /// Whether the snapshot is older than `max_age` relative to `now`
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.timestamp > max_age
    }
}

/// An event from the market-data collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FeedEvent {
    /// New book snapshot (replaces the previous one)
    Book(OrderBookSnapshot),
    /// Sequence discontinuity detected by the connector
    Gap {
        market_id: MarketId,
        expected: u64,
        got: u64,
    },
}
