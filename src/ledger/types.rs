//! Ledger types

use crate::market::{MarketId, Outcome, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exit policy configuration
///
/// Both checks are optional; `None` disables the check.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LedgerConfig {
    /// Close when unrealized loss reaches this fraction of cost
    #[serde(default)]
    pub stop_loss_pct: Option<Decimal>,
    /// Close when unrealized gain reaches this fraction of cost
    #[serde(default)]
    pub take_profit_pct: Option<Decimal>,
}

/// An open position accumulated from fills
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Market the position is in
    pub market_id: MarketId,
    /// Token side held
    pub side: Side,
    /// Shares held
    pub shares: Decimal,
    /// Dollar cost basis
    pub cost: Decimal,
    /// Volume-weighted average entry price
    pub avg_entry_price: Decimal,
    /// Unrealized profit at the last mark
    pub unrealized_pnl: Decimal,
    /// First fill time
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// Unrealized return as a fraction of cost
    pub fn unrealized_pct(&self) -> Decimal {
        if self.cost.is_zero() {
            Decimal::ZERO
        } else {
            self.unrealized_pnl / self.cost
        }
    }
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    /// Market resolved; shares settled at 1 or 0
    Resolved(Outcome),
    /// Stop-loss threshold reached
    StopLoss,
    /// Take-profit threshold reached
    TakeProfit,
    /// Closed by operator or shutdown
    Manual,
}

/// A settled position kept for the session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub market_id: MarketId,
    pub side: Side,
    pub shares: Decimal,
    pub avg_entry_price: Decimal,
    /// Exit price per share (settlement value for resolutions)
    pub exit_price: Decimal,
    pub realized_pnl: Decimal,
    pub reason: CloseReason,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}
