//! Per-market worker
//!
//! Owns every piece of mutable state for one market and consumes that
//! market's event queue. Because the queue serializes events, the pipeline
//! below needs no locking of its own; the shared risk manager and ledger
//! are the only synchronized touch points.

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use tokio::sync::mpsc;

use crate::baseline::BaselineTracker;
use crate::config::Config;
use crate::execution::{
    ExecutionGateway, GatewayEvent, IntentAction, OrderId, OrderPlacementEngine, PlacementUpdate,
};
use crate::feed::OrderBookSnapshot;
use crate::ledger::PositionLedger;
use crate::market::{MarketId, Outcome};
use crate::risk::{create_sizer, PositionSizer, RiskManager};
use crate::spike::SpikeDetector;

use super::{EngineError, MarketEvent};

/// Serialized event processor for one market
pub struct MarketWorker {
    market_id: MarketId,
    baseline: BaselineTracker,
    detector: SpikeDetector,
    placement: OrderPlacementEngine,
    sizer: Box<dyn PositionSizer>,
    risk: Arc<RiskManager>,
    ledger: Arc<Mutex<PositionLedger>>,
    gateway: Arc<dyn ExecutionGateway>,
    /// Sender back into this worker's own queue, for deadline timers
    events_tx: mpsc::Sender<MarketEvent>,
    stale_after: Duration,
    order_timeout: std::time::Duration,
    last_seq: Option<u64>,
}

impl MarketWorker {
    /// Build a worker for one market
    pub fn new(
        market_id: impl Into<MarketId>,
        config: &Config,
        risk: Arc<RiskManager>,
        ledger: Arc<Mutex<PositionLedger>>,
        gateway: Arc<dyn ExecutionGateway>,
        events_tx: mpsc::Sender<MarketEvent>,
    ) -> Self {
        let market_id = market_id.into();
        Self {
            baseline: BaselineTracker::new(config.baseline.clone()),
            detector: SpikeDetector::new(config.spike.clone()),
            placement: OrderPlacementEngine::new(market_id.clone(), config.orders.clone()),
            sizer: create_sizer(&config.sizing),
            risk,
            ledger,
            gateway,
            events_tx,
            stale_after: Duration::seconds(config.feed.stale_after_secs as i64),
            order_timeout: std::time::Duration::from_secs(config.orders.timeout_secs),
            last_seq: None,
            market_id,
        }
    }

    /// Consume the market's event queue until it closes
    ///
    /// Errors are contained per event: the failure is logged and the worker
    /// moves on to the next event.
    pub async fn run(mut self, mut rx: mpsc::Receiver<MarketEvent>) {
        while let Some(event) = rx.recv().await {
            match self.handle(event).await {
                Ok(()) => {}
                Err(e @ EngineError::StaleData { .. }) => {
                    tracing::debug!(market_id = %self.market_id, "{e}");
                }
                Err(e @ EngineError::RiskRejected(_)) => {
                    tracing::info!(market_id = %self.market_id, "{e}");
                }
                Err(e @ EngineError::FeedGap { .. }) => {
                    tracing::warn!(market_id = %self.market_id, "{e}");
                }
                Err(e @ EngineError::ExecutionRejected(_)) => {
                    tracing::error!(market_id = %self.market_id, "{e}");
                    metrics::counter!("sweepfade_engine_errors").increment(1);
                }
            }
        }
        tracing::debug!(market_id = %self.market_id, "Event channel closed, worker exiting");
    }

    /// Apply one event
    pub async fn handle(&mut self, event: MarketEvent) -> Result<(), EngineError> {
        match event {
            MarketEvent::Book(snapshot) => self.on_book(snapshot).await,
            MarketEvent::Gap { expected, got } => {
                self.on_gap(expected, got);
                Ok(())
            }
            MarketEvent::Gateway(event) => self.on_gateway(event),
            MarketEvent::OrderDeadline(order_id) => self.on_deadline(order_id).await,
            MarketEvent::Resolved(outcome) => self.on_resolved(outcome).await,
        }
    }

    async fn on_book(&mut self, snapshot: OrderBookSnapshot) -> Result<(), EngineError> {
        if let Some(last) = self.last_seq {
            if snapshot.seq != last + 1 {
                self.on_gap(last + 1, snapshot.seq);
                self.last_seq = Some(snapshot.seq);
                return Err(EngineError::FeedGap {
                    market_id: self.market_id.clone(),
                    expected: last + 1,
                    got: snapshot.seq,
                });
            }
        }
        self.last_seq = Some(snapshot.seq);

        let now = Utc::now();
        if snapshot.is_stale(now, self.stale_after) {
            metrics::counter!("sweepfade_stale_snapshots").increment(1);
            return Err(EngineError::StaleData {
                market_id: self.market_id.clone(),
                seq: snapshot.seq,
            });
        }

        self.baseline.update(&snapshot);

        // Manage any working order first: reconvergence and timeout beat entry
        if let Some(intent) = self
            .placement
            .on_book(&snapshot, self.baseline.get(&self.market_id), now)
        {
            let (order_id, action) = (intent.order_id, intent.action);
            if let Err(e) = self.gateway.submit(intent).await {
                self.placement.on_submit_failure(order_id, action);
                return Err(e.into());
            }
        }

        self.mark_position(&snapshot);

        let has_position = {
            let ledger = self.ledger.lock().expect("position ledger lock poisoned");
            ledger.position(&self.market_id).is_some()
        };
        if self.placement.has_open_order() || has_position {
            // Entries are blocked, but the sweep context must stay fresh
            self.detector.observe(&snapshot);
            return Ok(());
        }

        let Some(state) = self.baseline.get(&self.market_id) else {
            self.detector.observe(&snapshot);
            return Ok(());
        };
        let Some(spike) = self.detector.evaluate(&snapshot, state) else {
            return Ok(());
        };

        let cap = self.risk.budget().max_position_size;
        let candidate = self.sizer.size(&spike, state, cap);
        let size = match self.risk.authorize(&self.market_id, candidate) {
            Ok(size) => size,
            Err(e) => {
                metrics::counter!("sweepfade_risk_rejections").increment(1);
                return Err(e.into());
            }
        };

        match self.placement.place(&spike, &snapshot, size, now) {
            Some(intent) => {
                let order_id = intent.order_id;
                if let Err(e) = self.gateway.submit(intent).await {
                    // The gateway never saw the order: drop the phantom and
                    // free the budget so the market is not wedged
                    self.placement.on_submit_failure(order_id, IntentAction::Place);
                    self.risk.release(&self.market_id);
                    return Err(e.into());
                }
                self.spawn_deadline(order_id);
            }
            None => {
                // No usable quotes to rest against; free the reservation
                self.risk.release(&self.market_id);
            }
        }
        Ok(())
    }

    fn on_gap(&mut self, expected: u64, got: u64) {
        tracing::warn!(
            market_id = %self.market_id,
            expected,
            got,
            "Feed gap, resetting baseline for re-warm"
        );
        metrics::counter!("sweepfade_feed_gaps").increment(1);
        self.baseline.reset(&self.market_id);
        self.detector.reset(&self.market_id);
        self.last_seq = None;
    }

    fn on_gateway(&mut self, event: GatewayEvent) -> Result<(), EngineError> {
        match self.placement.on_gateway(&event) {
            PlacementUpdate::Fill {
                fill,
                order_complete,
            } => {
                let applied = self
                    .ledger
                    .lock()
                    .expect("position ledger lock poisoned")
                    .apply_fill(&fill);
                if applied && order_complete {
                    tracing::info!(market_id = %self.market_id, order_id = %fill.order_id, "Order fully filled");
                }
            }
            PlacementUpdate::Canceled { had_fill } => {
                // A cancel with no fills ends the attempt; free the budget.
                // With fills the position stays open and keeps the reservation.
                if !had_fill {
                    self.risk.release(&self.market_id);
                }
            }
            PlacementUpdate::Rejected { .. } => {
                self.risk.release(&self.market_id);
            }
            PlacementUpdate::Acked | PlacementUpdate::None => {}
        }
        Ok(())
    }

    async fn on_deadline(&mut self, order_id: OrderId) -> Result<(), EngineError> {
        if let Some(intent) = self.placement.on_deadline(order_id) {
            let action = intent.action;
            if let Err(e) = self.gateway.submit(intent).await {
                self.placement.on_submit_failure(order_id, action);
                return Err(e.into());
            }
        }
        Ok(())
    }

    async fn on_resolved(&mut self, outcome: Outcome) -> Result<(), EngineError> {
        // Pull any working order off the book first; a failed cancel submit
        // must not block settlement
        if let Some(order) = self.placement.open_order() {
            let order_id = order.id;
            if let Some(intent) = self.placement.on_deadline(order_id) {
                let action = intent.action;
                if let Err(e) = self.gateway.submit(intent).await {
                    self.placement.on_submit_failure(order_id, action);
                    tracing::warn!(
                        market_id = %self.market_id,
                        %order_id,
                        error = %e,
                        "Cancel submit failed during resolution, settling anyway"
                    );
                }
            }
        }

        let closed = self
            .ledger
            .lock()
            .expect("position ledger lock poisoned")
            .resolve(&self.market_id, outcome, Utc::now());
        if let Some(closed) = closed {
            self.risk.release(&self.market_id);
            tracing::info!(
                market_id = %self.market_id,
                outcome = ?outcome,
                realized_pnl = %closed.realized_pnl,
                "Market resolved, position settled"
            );
        }

        self.baseline.remove(&self.market_id);
        self.detector.reset(&self.market_id);
        Ok(())
    }

    /// Re-mark the open position and apply stop-loss / take-profit exits
    fn mark_position(&mut self, snapshot: &OrderBookSnapshot) {
        let mut ledger = self.ledger.lock().expect("position ledger lock poisoned");
        let Some(position) = ledger.position(&self.market_id) else {
            return;
        };
        let Some(bid) = snapshot.best_bid(position.side) else {
            return;
        };
        if let Some(reason) = ledger.mark(&self.market_id, bid) {
            if let Some(closed) = ledger.close(&self.market_id, bid, reason, Utc::now()) {
                drop(ledger);
                self.risk.release(&self.market_id);
                tracing::info!(
                    market_id = %self.market_id,
                    reason = ?closed.reason,
                    realized_pnl = %closed.realized_pnl,
                    "Exit triggered, position closed"
                );
            }
        }
    }

    fn spawn_deadline(&self, order_id: OrderId) {
        let tx = self.events_tx.clone();
        let timeout = self.order_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            // Worker gone means the engine is shutting down
            let _ = tx.send(MarketEvent::OrderDeadline(order_id)).await;
        });
    }
}
