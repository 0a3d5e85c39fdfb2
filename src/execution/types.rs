//! Execution types

use crate::market::{MarketId, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Order identifier
pub type OrderId = Uuid;

/// Fill identifier (dedup key for at-least-once delivery)
pub type FillId = Uuid;

/// Order lifecycle state
///
/// `New → Working → {Filled, PartiallyFilled, Canceled, Rejected}`;
/// `PartiallyFilled` may re-enter `Working` semantics (remaining size keeps
/// resting) or transition to `Canceled`. Terminal states are mutually
/// exclusive and final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    /// Submitted, not yet acknowledged
    New,
    /// Resting on the book
    Working,
    /// Partially executed, remainder still resting
    PartiallyFilled,
    /// Fully executed (terminal)
    Filled,
    /// Canceled with remaining size (terminal)
    Canceled,
    /// Rejected by the gateway (terminal)
    Rejected,
}

impl OrderState {
    /// Whether this state is terminal
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Canceled | OrderState::Rejected
        )
    }

    /// Whether the order is live on the book
    pub fn is_open(self) -> bool {
        matches!(
            self,
            OrderState::New | OrderState::Working | OrderState::PartiallyFilled
        )
    }

    fn can_transition(self, to: OrderState) -> bool {
        use OrderState::*;
        match (self, to) {
            (New, Working) | (New, Rejected) | (New, Canceled) => true,
            (Working, PartiallyFilled)
            | (Working, Filled)
            | (Working, Canceled)
            | (Working, Rejected) => true,
            (PartiallyFilled, Working)
            | (PartiallyFilled, PartiallyFilled)
            | (PartiallyFilled, Filled)
            | (PartiallyFilled, Canceled) => true,
            _ => false,
        }
    }
}

/// Invalid order state transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid order state transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: OrderState,
    pub to: OrderState,
}

/// A maker order managed by the placement engine
///
/// Owned by the placement engine until a terminal state; ownership of any
/// resulting fill transfers to the position ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier
    pub id: OrderId,
    /// Market the order rests in
    pub market_id: MarketId,
    /// Token side being bought
    pub side: Side,
    /// Limit price
    pub price: Decimal,
    /// Original size in dollars
    pub size: Decimal,
    /// Unfilled remainder
    pub remaining: Decimal,
    /// Lifecycle state
    pub state: OrderState,
    /// Estimated displayed size queued ahead at our price level
    ///
    /// No authoritative queue position is observable from public data; this
    /// is the depth ahead at placement time, decremented heuristically as
    /// displayed size shrinks on later snapshots.
    pub queue_ahead: Decimal,
    /// Cancel-and-replace count so far
    pub replace_count: u32,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a new order awaiting acknowledgment
    pub fn new(
        market_id: impl Into<MarketId>,
        side: Side,
        price: Decimal,
        size: Decimal,
        queue_ahead: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::new_v4(),
            market_id: market_id.into(),
            side,
            price,
            size,
            remaining: size,
            state: OrderState::New,
            queue_ahead,
            replace_count: 0,
            created_at,
        }
    }

    /// Apply a state transition, rejecting invalid ones
    ///
    /// A transition out of a terminal state is the signature of a gateway
    /// race (e.g. a cancel ack after a fill); callers reconcile those as
    /// no-ops rather than errors.
    pub fn transition(&mut self, to: OrderState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition(to) {
            return Err(InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

/// Action requested of the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentAction {
    /// Place a new resting order
    Place,
    /// Cancel the remaining size
    Cancel,
    /// Cancel and re-place at a new price
    Replace,
}

/// An instruction emitted to the execution gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Order this intent refers to
    pub order_id: OrderId,
    /// Market
    pub market_id: MarketId,
    /// Token side being bought
    pub side: Side,
    /// Limit price
    pub price: Decimal,
    /// Size (remaining size for Cancel/Replace)
    pub size: Decimal,
    /// Requested action
    pub action: IntentAction,
}

/// An executed trade reported by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    /// Unique fill identifier (dedup key)
    pub fill_id: FillId,
    /// Order that was filled
    pub order_id: OrderId,
    /// Market
    pub market_id: MarketId,
    /// Token side bought
    pub side: Side,
    /// Execution price
    pub price: Decimal,
    /// Executed size
    pub size: Decimal,
    /// Execution timestamp
    pub timestamp: DateTime<Utc>,
}

/// Gateway rejection reasons
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Cancel arrived after the order was already filled; reconciled as
    /// terminal success, not an error
    AlreadyFilled,
    /// Not enough balance to place
    InsufficientBalance,
    /// Price outside the venue's accepted range
    InvalidPrice,
    /// Anything else, verbatim from the gateway
    Other(String),
}

/// Asynchronous responses from the execution gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GatewayEvent {
    /// Placement acknowledged, order is resting
    Ack {
        order_id: OrderId,
        market_id: MarketId,
    },
    /// Cancel acknowledged, remaining size is off the book
    CancelAck {
        order_id: OrderId,
        market_id: MarketId,
    },
    /// Trade executed (at-least-once delivery)
    Fill(Fill),
    /// Intent rejected
    Reject {
        order_id: OrderId,
        market_id: MarketId,
        reason: RejectReason,
    },
}

impl GatewayEvent {
    /// Market this event belongs to, for routing
    pub fn market_id(&self) -> &str {
        match self {
            GatewayEvent::Ack { market_id, .. }
            | GatewayEvent::CancelAck { market_id, .. }
            | GatewayEvent::Reject { market_id, .. } => market_id,
            GatewayEvent::Fill(fill) => &fill.market_id,
        }
    }
}
