//! Position ledger
//!
//! The single source of truth for open positions. Fills are deduplicated by
//! fill id (gateway delivery is at-least-once), entries are averaged by
//! VWAP, and resolutions settle every share at 1 or 0. The ledger also
//! evaluates the optional stop-loss / take-profit exits on each mark.

mod types;

pub use types::{ClosedPosition, CloseReason, LedgerConfig, Position};

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::execution::{Fill, FillId};
use crate::market::{MarketId, Outcome, Side};

/// Open and closed positions for the session
pub struct PositionLedger {
    config: LedgerConfig,
    positions: HashMap<MarketId, Position>,
    seen_fills: HashSet<FillId>,
    closed: Vec<ClosedPosition>,
}

impl PositionLedger {
    /// Create an empty ledger
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            positions: HashMap::new(),
            seen_fills: HashSet::new(),
            closed: Vec::new(),
        }
    }

    /// Apply a fill, returning false if it was a duplicate
    ///
    /// A repeated fill id is a redelivery and must not change the position.
    pub fn apply_fill(&mut self, fill: &Fill) -> bool {
        if !self.seen_fills.insert(fill.fill_id) {
            tracing::debug!(fill_id = %fill.fill_id, "Duplicate fill ignored");
            return false;
        }
        if fill.price.is_zero() || fill.size.is_zero() {
            tracing::warn!(fill_id = %fill.fill_id, "Degenerate fill ignored");
            return false;
        }

        let shares = fill.size / fill.price;
        match self.positions.get_mut(&fill.market_id) {
            Some(position) => {
                if position.side != fill.side {
                    tracing::warn!(
                        market_id = %fill.market_id,
                        position_side = ?position.side,
                        fill_side = ?fill.side,
                        "Fill side does not match open position, ignoring"
                    );
                    return false;
                }
                position.shares += shares;
                position.cost += fill.size;
                position.avg_entry_price = position.cost / position.shares;
            }
            None => {
                self.positions.insert(
                    fill.market_id.clone(),
                    Position {
                        market_id: fill.market_id.clone(),
                        side: fill.side,
                        shares,
                        cost: fill.size,
                        avg_entry_price: fill.price,
                        unrealized_pnl: Decimal::ZERO,
                        opened_at: fill.timestamp,
                    },
                );
            }
        }

        tracing::info!(
            market_id = %fill.market_id,
            side = ?fill.side,
            price = %fill.price,
            size = %fill.size,
            "Fill applied"
        );
        metrics::counter!("sweepfade_fills_applied").increment(1);
        true
    }

    /// Re-mark a position against the current bid for its side
    ///
    /// Returns an exit reason when the configured stop-loss or take-profit
    /// threshold is hit.
    pub fn mark(&mut self, market_id: &str, bid: Decimal) -> Option<CloseReason> {
        let position = self.positions.get_mut(market_id)?;
        position.unrealized_pnl = position.shares * bid - position.cost;

        let pct = position.unrealized_pct();
        if let Some(stop) = self.config.stop_loss_pct {
            if pct <= -stop {
                return Some(CloseReason::StopLoss);
            }
        }
        if let Some(target) = self.config.take_profit_pct {
            if pct >= target {
                return Some(CloseReason::TakeProfit);
            }
        }
        None
    }

    /// Close a position at an exit price
    pub fn close(
        &mut self,
        market_id: &str,
        exit_price: Decimal,
        reason: CloseReason,
        now: DateTime<Utc>,
    ) -> Option<ClosedPosition> {
        let position = self.positions.remove(market_id)?;
        let realized = position.shares * exit_price - position.cost;

        let closed = ClosedPosition {
            market_id: position.market_id,
            side: position.side,
            shares: position.shares,
            avg_entry_price: position.avg_entry_price,
            exit_price,
            realized_pnl: realized,
            reason,
            opened_at: position.opened_at,
            closed_at: now,
        };
        tracing::info!(
            market_id = %closed.market_id,
            realized_pnl = %closed.realized_pnl,
            reason = ?closed.reason,
            "Position closed"
        );
        let session_pnl = self.realized_pnl() + realized;
        metrics::gauge!("sweepfade_realized_pnl").set(session_pnl.to_f64().unwrap_or(0.0));
        self.closed.push(closed.clone());
        Some(closed)
    }

    /// Settle a position on market resolution
    ///
    /// Shares pay 1 when the held side matches the outcome, 0 otherwise.
    pub fn resolve(
        &mut self,
        market_id: &str,
        outcome: Outcome,
        now: DateTime<Utc>,
    ) -> Option<ClosedPosition> {
        let side = self.positions.get(market_id)?.side;
        let won = matches!(
            (side, outcome),
            (Side::Yes, Outcome::Yes) | (Side::No, Outcome::No)
        );
        let settlement = if won { Decimal::ONE } else { Decimal::ZERO };
        self.close(market_id, settlement, CloseReason::Resolved(outcome), now)
    }

    /// Open position for a market, if any
    pub fn position(&self, market_id: &str) -> Option<&Position> {
        self.positions.get(market_id)
    }

    /// All open positions
    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Number of open positions
    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    /// Closed positions in close order
    pub fn closed(&self) -> &[ClosedPosition] {
        &self.closed
    }

    /// Total realized profit over the session
    pub fn realized_pnl(&self) -> Decimal {
        self.closed.iter().map(|c| c.realized_pnl).sum()
    }
}
