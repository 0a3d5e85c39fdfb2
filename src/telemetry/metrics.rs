//! Prometheus metrics

use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter and register metric descriptions
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()?;

    describe_counter!("sweepfade_orders_placed", "Fade orders submitted");
    describe_counter!("sweepfade_orders_replaced", "Cancel-and-replace cycles");
    describe_counter!("sweepfade_orders_canceled", "Cancel intents submitted");
    describe_counter!("sweepfade_fills_applied", "Fills applied to the ledger");
    describe_counter!("sweepfade_risk_rejections", "Spikes rejected by the risk gate");
    describe_counter!("sweepfade_feed_gaps", "Feed sequence gaps observed");
    describe_counter!("sweepfade_stale_snapshots", "Snapshots skipped as stale");
    describe_counter!("sweepfade_engine_errors", "Contained per-event failures");
    describe_gauge!("sweepfade_open_positions", "Markets with reserved exposure");
    describe_gauge!("sweepfade_realized_pnl", "Session realized profit in dollars");

    tracing::info!(port, "Prometheus exporter listening");
    Ok(())
}
