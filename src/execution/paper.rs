//! Paper trading gateway with simulated fills

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{mpsc, Mutex, RwLock};

use super::types::{Fill, FillId, GatewayEvent, IntentAction, OrderId, OrderIntent, RejectReason};
use super::ExecutionGateway;

/// Paper gateway configuration
#[derive(Debug, Clone)]
pub struct PaperConfig {
    /// Simulated latency between acknowledgment and fill
    pub fill_delay_ms: u64,
    /// Fraction of each placed order that executes (1 = full fill)
    pub fill_ratio: Decimal,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            fill_delay_ms: 50,
            fill_ratio: Decimal::ONE,
        }
    }
}

/// Simulated execution gateway
///
/// Acks every placement, then fills it at the limit price after a configured
/// delay. A cancel that arrives after the simulated fill is rejected with
/// [`RejectReason::AlreadyFilled`], which reproduces the live cancel/fill
/// race for the layers above.
pub struct PaperGateway {
    config: PaperConfig,
    open: Arc<RwLock<HashMap<OrderId, OrderIntent>>>,
    events_tx: mpsc::Sender<GatewayEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<GatewayEvent>>>,
}

impl PaperGateway {
    /// Create a paper gateway
    pub fn new(config: PaperConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(1024);
        Self {
            config,
            open: Arc::new(RwLock::new(HashMap::new())),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    async fn handle_place(&self, intent: OrderIntent) -> anyhow::Result<()> {
        {
            let mut open = self.open.write().await;
            open.insert(intent.order_id, intent.clone());
        }
        self.events_tx
            .send(GatewayEvent::Ack {
                order_id: intent.order_id,
                market_id: intent.market_id.clone(),
            })
            .await?;

        let open = Arc::clone(&self.open);
        let events_tx = self.events_tx.clone();
        let delay = Duration::from_millis(self.config.fill_delay_ms);
        let fill_size = intent.size * self.config.fill_ratio;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // A cancel may have landed during the delay
            let resting = {
                let mut guard = open.write().await;
                guard.remove(&intent.order_id)
            };
            let Some(resting) = resting else {
                return;
            };

            let fill = Fill {
                fill_id: FillId::new_v4(),
                order_id: resting.order_id,
                market_id: resting.market_id.clone(),
                side: resting.side,
                price: resting.price,
                size: fill_size.min(resting.size),
                timestamp: Utc::now(),
            };
            tracing::info!(order_id = %fill.order_id, price = %fill.price, size = %fill.size, "Paper fill");
            if events_tx.send(GatewayEvent::Fill(fill)).await.is_err() {
                tracing::debug!("Paper gateway event receiver dropped");
            }
        });

        Ok(())
    }

    async fn handle_cancel(&self, intent: OrderIntent) -> anyhow::Result<()> {
        let removed = {
            let mut open = self.open.write().await;
            open.remove(&intent.order_id)
        };
        let event = if removed.is_some() {
            tracing::info!(order_id = %intent.order_id, "Paper order canceled");
            GatewayEvent::CancelAck {
                order_id: intent.order_id,
                market_id: intent.market_id,
            }
        } else {
            // Fill already simulated; the live venue answers the same way
            GatewayEvent::Reject {
                order_id: intent.order_id,
                market_id: intent.market_id,
                reason: RejectReason::AlreadyFilled,
            }
        };
        self.events_tx.send(event).await?;
        Ok(())
    }

    async fn handle_replace(&self, intent: OrderIntent) -> anyhow::Result<()> {
        let mut open = self.open.write().await;
        match open.get_mut(&intent.order_id) {
            Some(resting) => {
                resting.price = intent.price;
                resting.size = intent.size;
                drop(open);
                tracing::info!(order_id = %intent.order_id, price = %intent.price, "Paper order replaced");
                self.events_tx
                    .send(GatewayEvent::Ack {
                        order_id: intent.order_id,
                        market_id: intent.market_id,
                    })
                    .await?;
            }
            None => {
                drop(open);
                self.events_tx
                    .send(GatewayEvent::Reject {
                        order_id: intent.order_id,
                        market_id: intent.market_id,
                        reason: RejectReason::AlreadyFilled,
                    })
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionGateway for PaperGateway {
    async fn submit(&self, intent: OrderIntent) -> anyhow::Result<()> {
        match intent.action {
            IntentAction::Place => self.handle_place(intent).await,
            IntentAction::Cancel => self.handle_cancel(intent).await,
            IntentAction::Replace => self.handle_replace(intent).await,
        }
    }

    async fn events(&self) -> anyhow::Result<mpsc::Receiver<GatewayEvent>> {
        self.events_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow::anyhow!("Paper gateway event stream already taken"))
    }
}
