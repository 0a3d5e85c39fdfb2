//! Run command implementation

use std::sync::Arc;

use clap::Args;

use crate::config::{Config, ExecutionMode};
use crate::engine::ExecutionOrchestrator;
use crate::execution::{ExecutionGateway, PaperConfig, PaperGateway};
use crate::feed::FeedBus;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunArgs {
    /// Wire the engine and run until interrupted
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let feed = Arc::new(FeedBus::new(config.feed.channel_capacity));
        let gateway: Arc<dyn ExecutionGateway> = match config.execution.mode {
            ExecutionMode::Paper => Arc::new(PaperGateway::new(PaperConfig {
                fill_delay_ms: config.execution.paper_fill_delay_ms,
                fill_ratio: config.execution.paper_fill_ratio,
            })),
            ExecutionMode::Live => {
                anyhow::bail!("Live execution gateway is not configured; use paper mode")
            }
        };

        let mut engine = ExecutionOrchestrator::new(config, feed, gateway);
        engine.start().await?;

        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown signal received");

        {
            let ledger = engine.ledger();
            let ledger = ledger.lock().expect("position ledger lock poisoned");
            tracing::info!(
                open_positions = ledger.open_count(),
                closed_positions = ledger.closed().len(),
                realized_pnl = %ledger.realized_pnl(),
                "Session summary"
            );
        }

        engine.shutdown().await;
        Ok(())
    }
}
