//! Market data feed module
//!
//! The engine consumes sequenced order book snapshots per market. Actual
//! connectivity (WebSocket transport, normalization) is an external
//! collaborator; this module defines the seam and an in-process bus that
//! connectors push into.

mod types;

pub use types::{FeedEvent, OrderBookSnapshot, PriceLevel};

use crate::market::MarketId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Trait for market data feed implementations
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Subscribe to sequenced book updates for one market
    async fn subscribe(&self, market_id: &str) -> anyhow::Result<mpsc::Receiver<FeedEvent>>;
}

/// In-process feed bus
///
/// External connectors call [`FeedBus::publish`]; the engine subscribes per
/// market. Events for one market are delivered in publish order, which is
/// what preserves causal ordering of book updates downstream.
pub struct FeedBus {
    channels: Mutex<HashMap<MarketId, mpsc::Sender<FeedEvent>>>,
    capacity: usize,
}

impl FeedBus {
    /// Create a bus with the given per-market channel capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Deliver a feed event to the subscriber for its market
    ///
    /// Events for unsubscribed markets are dropped. A full channel drops the
    /// event and logs; the sequence gap this creates is surfaced by the
    /// connector on the next snapshot.
    pub fn publish(&self, event: FeedEvent) {
        let market_id = match &event {
            FeedEvent::Book(snap) => snap.market_id.clone(),
            FeedEvent::Gap { market_id, .. } => market_id.clone(),
        };

        let channels = self.channels.lock().expect("feed bus lock poisoned");
        if let Some(tx) = channels.get(&market_id) {
            if let Err(e) = tx.try_send(event) {
                tracing::warn!(market_id = %market_id, error = %e, "Feed channel full, dropping event");
            }
        }
    }
}

impl Default for FeedBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl MarketFeed for FeedBus {
    async fn subscribe(&self, market_id: &str) -> anyhow::Result<mpsc::Receiver<FeedEvent>> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut channels = self.channels.lock().expect("feed bus lock poisoned");
        channels.insert(market_id.to_string(), tx);
        Ok(rx)
    }
}
