//! Engine wiring
//!
//! Subscribes each configured market to the feed, spawns its worker task,
//! and routes gateway events back to the owning worker. Shutdown aborts all
//! tasks; in paper mode no external state needs draining.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::Config;
use crate::execution::ExecutionGateway;
use crate::feed::{FeedEvent, MarketFeed};
use crate::ledger::PositionLedger;
use crate::market::{Market, MarketId, MarketStatus, Outcome};
use crate::risk::RiskManager;

use super::{MarketEvent, MarketWorker};

/// Runs the per-market pipelines and the shared routing tasks
pub struct ExecutionOrchestrator {
    config: Config,
    feed: Arc<dyn MarketFeed>,
    gateway: Arc<dyn ExecutionGateway>,
    risk: Arc<RiskManager>,
    ledger: Arc<Mutex<PositionLedger>>,
    /// Subscription registry; entries flip to `Resolved` and stop trading
    markets: HashMap<MarketId, Market>,
    senders: HashMap<MarketId, mpsc::Sender<MarketEvent>>,
    tasks: JoinSet<()>,
}

impl ExecutionOrchestrator {
    /// Build an orchestrator; call [`start`](Self::start) to spawn workers
    pub fn new(
        config: Config,
        feed: Arc<dyn MarketFeed>,
        gateway: Arc<dyn ExecutionGateway>,
    ) -> Self {
        let risk = Arc::new(RiskManager::new(config.risk.clone()));
        let ledger = Arc::new(Mutex::new(PositionLedger::new(config.ledger.clone())));
        Self {
            config,
            feed,
            gateway,
            risk,
            ledger,
            markets: HashMap::new(),
            senders: HashMap::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Subscription state for a market
    pub fn market(&self, market_id: &str) -> Option<&Market> {
        self.markets.get(market_id)
    }

    /// Shared risk manager
    pub fn risk(&self) -> Arc<RiskManager> {
        Arc::clone(&self.risk)
    }

    /// Shared position ledger
    pub fn ledger(&self) -> Arc<Mutex<PositionLedger>> {
        Arc::clone(&self.ledger)
    }

    /// Subscribe markets, spawn workers, and start routing
    pub async fn start(&mut self) -> anyhow::Result<()> {
        let markets = self.config.markets.clone();
        for market_id in &markets {
            self.spawn_market(market_id).await?;
        }

        // One router fans gateway events out to the owning market's queue,
        // preserving per-market ordering
        let mut gateway_rx = self.gateway.events().await?;
        let senders = self.senders.clone();
        self.tasks.spawn(async move {
            while let Some(event) = gateway_rx.recv().await {
                let Some(tx) = senders.get(event.market_id()) else {
                    tracing::warn!(market_id = %event.market_id(), "Gateway event for unknown market");
                    continue;
                };
                if tx.send(MarketEvent::Gateway(event)).await.is_err() {
                    break;
                }
            }
        });

        tracing::info!(markets = markets.len(), "Engine started");
        Ok(())
    }

    async fn spawn_market(&mut self, market_id: &str) -> anyhow::Result<()> {
        let (tx, rx) = mpsc::channel(self.config.feed.channel_capacity);

        let worker = MarketWorker::new(
            market_id,
            &self.config,
            Arc::clone(&self.risk),
            Arc::clone(&self.ledger),
            Arc::clone(&self.gateway),
            tx.clone(),
        );
        self.tasks.spawn(worker.run(rx));

        let mut feed_rx = self.feed.subscribe(market_id).await?;
        let worker_tx = tx.clone();
        let market = market_id.to_string();
        self.tasks.spawn(async move {
            while let Some(event) = feed_rx.recv().await {
                let event = match event {
                    FeedEvent::Book(snapshot) => MarketEvent::Book(snapshot),
                    FeedEvent::Gap { expected, got, .. } => MarketEvent::Gap { expected, got },
                };
                if worker_tx.send(event).await.is_err() {
                    break;
                }
            }
            tracing::debug!(market_id = %market, "Feed stream ended");
        });

        self.markets.insert(market_id.to_string(), Market::new(market_id));
        self.senders.insert(market_id.to_string(), tx);
        tracing::info!(market_id, "Market subscribed");
        Ok(())
    }

    /// Notify a market's worker that the market resolved
    ///
    /// The registry entry flips to `Resolved`; the sender stays registered so
    /// late gateway events (the resolution-triggered cancel ack) still route.
    pub async fn resolve(&mut self, market_id: &str, outcome: Outcome) -> anyhow::Result<()> {
        let tx = self
            .senders
            .get(market_id)
            .ok_or_else(|| anyhow::anyhow!("Unknown market {market_id}"))?;
        tx.send(MarketEvent::Resolved(outcome)).await?;
        if let Some(market) = self.markets.get_mut(market_id) {
            market.status = MarketStatus::Resolved(outcome);
        }
        Ok(())
    }

    /// Abort all workers and routing tasks
    pub async fn shutdown(&mut self) {
        self.senders.clear();
        self.tasks.shutdown().await;
        tracing::info!("Engine stopped");
    }
}
