//! Engine orchestration
//!
//! One worker task per market serializes every event that can touch that
//! market's state, so the per-market pipeline never needs internal locking.
//! Markets run concurrently; the only cross-market coordination points are
//! the risk manager and the position ledger.

mod orchestrator;
mod worker;

pub use orchestrator::ExecutionOrchestrator;
pub use worker::MarketWorker;

use thiserror::Error;

use crate::execution::{GatewayEvent, OrderId};
use crate::feed::OrderBookSnapshot;
use crate::market::{MarketId, Outcome};

/// An event on a market's serialized queue
///
/// Everything that can mutate per-market state arrives here, in order.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    /// Sequenced order book snapshot
    Book(OrderBookSnapshot),
    /// Feed discontinuity reported by the connector
    Gap { expected: u64, got: u64 },
    /// Asynchronous gateway response
    Gateway(GatewayEvent),
    /// A working order's timeout deadline elapsed
    OrderDeadline(OrderId),
    /// The market resolved to a final outcome
    Resolved(Outcome),
}

/// Per-event failures, contained by the worker loop
///
/// None of these stop the worker: each is logged at a severity matching how
/// normal it is (risk rejections and stale ticks are routine, gateway
/// submission failures are not) and the next event is handled fresh.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Feed gap on {market_id}: expected {expected}, got {got}")]
    FeedGap {
        market_id: MarketId,
        expected: u64,
        got: u64,
    },
    #[error("Stale snapshot for {market_id} (seq {seq})")]
    StaleData { market_id: MarketId, seq: u64 },
    #[error("Risk gate rejected candidate: {0}")]
    RiskRejected(#[from] crate::risk::RiskError),
    #[error("Execution rejected: {0}")]
    ExecutionRejected(#[from] anyhow::Error),
}
