//! Maker order placement and queue management
//!
//! Decides price aggressiveness for fade orders, tracks estimated queue
//! position, and manages cancel/replace while the order is working. All
//! pricing is strictly maker-side: an emitted price never crosses the
//! opposing best quote.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::baseline::BaselineState;
use crate::feed::OrderBookSnapshot;
use crate::market::{MarketId, Side};
use crate::spike::SpikeEvent;

use super::types::{
    Fill, GatewayEvent, IntentAction, Order, OrderId, OrderIntent, OrderState, RejectReason,
};

/// Configuration for order placement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Venue price tick
    pub tick_size: Decimal,
    /// Ticks to improve the best bid by on placement
    pub price_offset_ticks: u32,
    /// Cancel-and-replace once the best bid is this many ticks past us
    pub requeue_threshold_ticks: u32,
    /// Maximum cancel-and-replace cycles per order
    pub max_replace_count: u32,
    /// Cancel unconditionally after this long unfilled
    pub timeout_secs: u64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            tick_size: dec!(0.01),
            price_offset_ticks: 1,
            requeue_threshold_ticks: 2,
            max_replace_count: 3,
            timeout_secs: 120,
        }
    }
}

/// Outcome of applying a gateway event to the placement engine
#[derive(Debug, Clone)]
pub enum PlacementUpdate {
    /// Nothing actionable changed
    None,
    /// Order acknowledged and now resting
    Acked,
    /// A fill to hand to the ledger; `order_complete` when nothing rests
    Fill { fill: Fill, order_complete: bool },
    /// Order canceled; `had_fill` when part of it executed first
    Canceled { had_fill: bool },
    /// Placement rejected by the gateway
    Rejected { reason: RejectReason },
}

struct ManagedOrder {
    order: Order,
    /// Threshold in effect when the spike fired; reconvergence is judged
    /// against half of it
    fired_threshold: Decimal,
    filled: Decimal,
    cancel_requested: bool,
}

/// Per-market placement engine; owns at most one live order at a time
pub struct OrderPlacementEngine {
    config: PlacementConfig,
    timeout: Duration,
    market_id: MarketId,
    open: Option<ManagedOrder>,
}

impl OrderPlacementEngine {
    /// Create an engine for one market
    pub fn new(market_id: impl Into<MarketId>, config: PlacementConfig) -> Self {
        let timeout = Duration::seconds(config.timeout_secs as i64);
        Self {
            config,
            timeout,
            market_id: market_id.into(),
            open: None,
        }
    }

    /// The currently managed order, if any
    pub fn open_order(&self) -> Option<&Order> {
        self.open.as_ref().map(|m| &m.order)
    }

    /// Whether an order is currently live
    pub fn has_open_order(&self) -> bool {
        self.open
            .as_ref()
            .is_some_and(|m| m.order.state.is_open())
    }

    /// Maker price for buying `side`: a configured number of ticks inside
    /// the best bid, capped one tick below the best ask
    pub fn maker_price(&self, book: &OrderBookSnapshot, side: Side) -> Option<Decimal> {
        let bid = book.best_bid(side)?;
        let ask = book.best_ask(side)?;
        let offset = self.config.tick_size * Decimal::from(self.config.price_offset_ticks);
        let price = (bid + offset).min(ask - self.config.tick_size);
        (price >= self.config.tick_size).then_some(price)
    }

    /// Place a fade order for an authorized spike
    ///
    /// Returns `None` when an order is already live for this market or when
    /// the book has no usable quotes.
    pub fn place(
        &mut self,
        spike: &SpikeEvent,
        book: &OrderBookSnapshot,
        size: Decimal,
        now: DateTime<Utc>,
    ) -> Option<OrderIntent> {
        if self.has_open_order() {
            tracing::debug!(market_id = %self.market_id, "Order already working, skipping placement");
            return None;
        }

        let side = spike.direction.fade_side();
        let price = self.maker_price(book, side)?;
        let queue_ahead = book.bid_depth_at_or_above(side, price);

        let order = Order::new(self.market_id.clone(), side, price, size, queue_ahead, now);
        let intent = OrderIntent {
            order_id: order.id,
            market_id: order.market_id.clone(),
            side,
            price,
            size,
            action: IntentAction::Place,
        };

        tracing::info!(
            market_id = %self.market_id,
            order_id = %order.id,
            ?side,
            %price,
            %size,
            %queue_ahead,
            "Placing fade order"
        );
        metrics::counter!("sweepfade_orders_placed").increment(1);

        self.open = Some(ManagedOrder {
            order,
            fired_threshold: spike.fired_threshold,
            filled: Decimal::ZERO,
            cancel_requested: false,
        });
        Some(intent)
    }

    /// React to a book update for this market while an order is live
    ///
    /// Priority: reconvergence cancel, then timeout cancel, then
    /// cancel-and-replace on unfavorable queue position.
    pub fn on_book(
        &mut self,
        book: &OrderBookSnapshot,
        baseline: Option<&BaselineState>,
        now: DateTime<Utc>,
    ) -> Option<OrderIntent> {
        let managed = self.open.as_mut()?;
        if !managed.order.state.is_open() || managed.cancel_requested {
            return None;
        }

        let side = managed.order.side;
        let price = managed.order.price;

        // Queue estimate only shrinks: displayed size ahead that disappears
        // has either traded or canceled, and either way we moved up
        let displayed = book.bid_depth_at_or_above(side, price);
        let ahead = (displayed - managed.order.remaining).max(Decimal::ZERO);
        managed.order.queue_ahead = managed.order.queue_ahead.min(ahead);

        // Edge decayed: the quote re-converged toward baseline, so chasing
        // the fill has negative expected value
        if let (Some(baseline), Some(yes_bid)) = (baseline, book.best_bid(Side::Yes)) {
            let deviation = (yes_bid - baseline.price).abs();
            if deviation < managed.fired_threshold / Decimal::TWO {
                tracing::info!(
                    market_id = %self.market_id,
                    order_id = %managed.order.id,
                    %deviation,
                    "Baseline re-converged, canceling without replace"
                );
                return self.request_cancel();
            }
        }

        if now - managed.order.created_at >= self.timeout {
            tracing::info!(
                market_id = %self.market_id,
                order_id = %managed.order.id,
                "Order timed out unfilled, canceling"
            );
            return self.request_cancel();
        }

        // Price ran away from us: re-join closer to the top if we still may
        let threshold =
            self.config.tick_size * Decimal::from(self.config.requeue_threshold_ticks);
        let best_bid = book.best_bid(side)?;
        if best_bid >= price + threshold && managed.order.replace_count < self.config.max_replace_count
        {
            let new_price = self.maker_price(book, side)?;
            if new_price > price {
                let managed = self.open.as_mut()?;
                managed.order.price = new_price;
                managed.order.replace_count += 1;
                managed.order.queue_ahead = book.bid_depth_at_or_above(side, new_price);

                tracing::info!(
                    market_id = %self.market_id,
                    order_id = %managed.order.id,
                    %new_price,
                    replace_count = managed.order.replace_count,
                    "Queue position unfavorable, cancel-and-replace"
                );
                metrics::counter!("sweepfade_orders_replaced").increment(1);

                return Some(OrderIntent {
                    order_id: managed.order.id,
                    market_id: self.market_id.clone(),
                    side,
                    price: new_price,
                    size: managed.order.remaining,
                    action: IntentAction::Replace,
                });
            }
        }

        None
    }

    /// Handle an order-timeout deadline
    ///
    /// Late deadlines are ignored by order-id and state check, which is what
    /// guarantees a fill never triggers a spurious cancel afterwards.
    pub fn on_deadline(&mut self, order_id: OrderId) -> Option<OrderIntent> {
        let managed = self.open.as_ref()?;
        if managed.order.id != order_id
            || !managed.order.state.is_open()
            || managed.cancel_requested
        {
            return None;
        }
        tracing::info!(market_id = %self.market_id, %order_id, "Timeout deadline reached, canceling");
        self.request_cancel()
    }

    /// Roll back local state for an intent that never reached the gateway
    ///
    /// A failed Place leaves nothing resting, so the phantom order is
    /// dropped; a failed Cancel clears `cancel_requested` so the next book
    /// tick or deadline re-issues it. A failed Replace needs no rollback:
    /// the original order still rests at the gateway and the replace
    /// conditions re-fire on a later tick.
    pub fn on_submit_failure(&mut self, order_id: OrderId, action: IntentAction) {
        let Some(managed) = self.open.as_mut() else {
            return;
        };
        if managed.order.id != order_id {
            return;
        }
        match action {
            IntentAction::Place => {
                tracing::warn!(
                    market_id = %self.market_id,
                    %order_id,
                    "Placement never reached the gateway, dropping order"
                );
                self.open = None;
            }
            IntentAction::Cancel => {
                tracing::warn!(
                    market_id = %self.market_id,
                    %order_id,
                    "Cancel never reached the gateway, will retry"
                );
                managed.cancel_requested = false;
            }
            IntentAction::Replace => {}
        }
    }

    fn request_cancel(&mut self) -> Option<OrderIntent> {
        let managed = self.open.as_mut()?;
        managed.cancel_requested = true;
        metrics::counter!("sweepfade_orders_canceled").increment(1);
        Some(OrderIntent {
            order_id: managed.order.id,
            market_id: self.market_id.clone(),
            side: managed.order.side,
            price: managed.order.price,
            size: managed.order.remaining,
            action: IntentAction::Cancel,
        })
    }

    /// Apply a gateway event for this market
    pub fn on_gateway(&mut self, event: &GatewayEvent) -> PlacementUpdate {
        match event {
            GatewayEvent::Ack { order_id, .. } => {
                if let Some(managed) = self.open.as_mut() {
                    if managed.order.id == *order_id && managed.order.state == OrderState::New {
                        // New -> Working cannot fail
                        let _ = managed.order.transition(OrderState::Working);
                        return PlacementUpdate::Acked;
                    }
                }
                PlacementUpdate::None
            }

            GatewayEvent::Fill(fill) => self.apply_fill(fill),

            GatewayEvent::CancelAck { order_id, .. } => {
                let Some(managed) = self.open.as_mut() else {
                    return PlacementUpdate::None;
                };
                if managed.order.id != *order_id {
                    return PlacementUpdate::None;
                }
                match managed.order.transition(OrderState::Canceled) {
                    Ok(()) => {
                        let had_fill = managed.filled > Decimal::ZERO;
                        self.open = None;
                        PlacementUpdate::Canceled { had_fill }
                    }
                    // Already terminal: cancel raced a fill, nothing to undo
                    Err(_) => {
                        self.open = None;
                        PlacementUpdate::None
                    }
                }
            }

            GatewayEvent::Reject {
                order_id, reason, ..
            } => {
                let Some(managed) = self.open.as_mut() else {
                    return PlacementUpdate::None;
                };
                if managed.order.id != *order_id {
                    return PlacementUpdate::None;
                }
                if *reason == RejectReason::AlreadyFilled {
                    // Our cancel lost the race to a fill. The fill event
                    // settles the order; this reject is terminal success.
                    tracing::debug!(
                        market_id = %self.market_id,
                        %order_id,
                        "Cancel rejected, order already filled; reconciling as no-op"
                    );
                    managed.cancel_requested = false;
                    return PlacementUpdate::None;
                }
                let _ = managed.order.transition(OrderState::Rejected);
                let reason = reason.clone();
                self.open = None;
                tracing::warn!(market_id = %self.market_id, %order_id, ?reason, "Order rejected by gateway");
                PlacementUpdate::Rejected { reason }
            }
        }
    }

    fn apply_fill(&mut self, fill: &Fill) -> PlacementUpdate {
        let Some(managed) = self.open.as_mut() else {
            // Fill for an order we no longer manage (late delivery); the
            // ledger dedups, so forward it as complete
            return PlacementUpdate::Fill {
                fill: fill.clone(),
                order_complete: true,
            };
        };
        if managed.order.id != fill.order_id {
            return PlacementUpdate::Fill {
                fill: fill.clone(),
                order_complete: true,
            };
        }

        managed.filled += fill.size;
        managed.order.remaining = (managed.order.remaining - fill.size).max(Decimal::ZERO);

        if managed.order.remaining.is_zero() {
            let _ = managed.order.transition(OrderState::Filled);
            self.open = None;
            PlacementUpdate::Fill {
                fill: fill.clone(),
                order_complete: true,
            }
        } else {
            let _ = managed.order.transition(OrderState::PartiallyFilled);
            PlacementUpdate::Fill {
                fill: fill.clone(),
                order_complete: false,
            }
        }
    }
}
