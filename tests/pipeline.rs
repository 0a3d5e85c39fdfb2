//! End-to-end pipeline tests: feed events in, orders and positions out

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

use sweepfade::config::Config;
use sweepfade::engine::{ExecutionOrchestrator, MarketEvent, MarketWorker};
use sweepfade::execution::{
    Fill, FillId, GatewayEvent, OrderId, PaperConfig, PaperGateway,
};
use sweepfade::feed::{FeedBus, FeedEvent, OrderBookSnapshot, PriceLevel};
use sweepfade::ledger::{CloseReason, LedgerConfig, PositionLedger};
use sweepfade::market::Side;
use sweepfade::risk::RiskManager;

fn config(markets: &[&str]) -> Config {
    let mut config = Config {
        markets: markets.iter().map(|m| m.to_string()).collect(),
        ..Config::default()
    };
    config.baseline.warmup_samples = 3;
    config
}

fn snap(market: &str, seq: u64, bid: Decimal, ask: Decimal) -> OrderBookSnapshot {
    OrderBookSnapshot {
        market_id: market.to_string(),
        seq,
        timestamp: Utc::now(),
        yes_bids: vec![PriceLevel::new(bid, dec!(600))],
        yes_asks: vec![PriceLevel::new(ask, dec!(600))],
    }
}

/// Five calm ticks at 0.30/0.32, then a spiked tick at 0.55/0.57
fn publish_spike_sequence(bus: &FeedBus, market: &str) {
    for seq in 1..=5 {
        bus.publish(FeedEvent::Book(snap(market, seq, dec!(0.30), dec!(0.32))));
    }
    bus.publish(FeedEvent::Book(snap(market, 6, dec!(0.55), dec!(0.57))));
}

fn paper(fill_delay_ms: u64) -> Arc<PaperGateway> {
    Arc::new(PaperGateway::new(PaperConfig {
        fill_delay_ms,
        fill_ratio: Decimal::ONE,
    }))
}

#[tokio::test]
async fn test_spike_fades_at_maker_price() {
    let bus = Arc::new(FeedBus::default());
    let mut engine = ExecutionOrchestrator::new(config(&["m1"]), Arc::clone(&bus) as _, paper(10));
    engine.start().await.unwrap();

    publish_spike_sequence(&bus, "m1");
    tokio::time::sleep(Duration::from_millis(300)).await;

    let ledger = engine.ledger();
    let ledger = ledger.lock().unwrap();
    let position = ledger.position("m1").expect("fade position should be open");
    // YES spiked, so the fade buys NO one tick inside the NO bid:
    // NO bid = 1 - 0.57 = 0.43, entry at 0.44 and never crossing 0.45
    assert_eq!(position.side, Side::No);
    assert_eq!(position.avg_entry_price, dec!(0.44));
    assert_eq!(position.cost, dec!(100));
    drop(ledger);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_correlation_group_caps_aggregate_exposure() {
    let bus = Arc::new(FeedBus::default());
    let mut cfg = config(&["m1", "m2"]);
    cfg.risk.groups = vec![sweepfade::risk::CorrelationGroup {
        id: "election".to_string(),
        exposure_cap: dec!(150),
        markets: vec!["m1".to_string(), "m2".to_string()],
    }];

    let mut engine = ExecutionOrchestrator::new(cfg, Arc::clone(&bus) as _, paper(10));
    engine.start().await.unwrap();

    publish_spike_sequence(&bus, "m1");
    tokio::time::sleep(Duration::from_millis(200)).await;
    publish_spike_sequence(&bus, "m2");
    tokio::time::sleep(Duration::from_millis(200)).await;

    // First $100 position fills; the second would push the group to $200
    let risk = engine.risk();
    assert!(risk.has_reservation("m1"));
    assert!(!risk.has_reservation("m2"));
    assert_eq!(risk.group_exposure("election"), dec!(100));
    engine.shutdown().await;
}

/// Harness for driving a worker directly, without timing dependence
struct WorkerHarness {
    worker: MarketWorker,
    risk: Arc<RiskManager>,
    ledger: Arc<Mutex<PositionLedger>>,
    _events_rx: mpsc::Receiver<MarketEvent>,
}

async fn worker_harness(config: Config) -> WorkerHarness {
    let gateway = paper(60_000);
    let risk = Arc::new(RiskManager::new(config.risk.clone()));
    let ledger = Arc::new(Mutex::new(PositionLedger::new(config.ledger.clone())));
    let (events_tx, events_rx) = mpsc::channel(64);
    let worker = MarketWorker::new(
        "m1",
        &config,
        Arc::clone(&risk),
        Arc::clone(&ledger),
        gateway,
        events_tx,
    );
    WorkerHarness {
        worker,
        risk,
        ledger,
        _events_rx: events_rx,
    }
}

fn fill(order_id: OrderId, price: Decimal, size: Decimal) -> Fill {
    Fill {
        fill_id: FillId::new_v4(),
        order_id,
        market_id: "m1".to_string(),
        side: Side::No,
        price,
        size,
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn test_redelivered_fill_does_not_double_count() {
    let mut h = worker_harness(config(&["m1"])).await;
    h.risk.authorize("m1", dec!(100)).unwrap();

    let the_fill = fill(OrderId::new_v4(), dec!(0.44), dec!(44));
    for _ in 0..3 {
        h.worker
            .handle(MarketEvent::Gateway(GatewayEvent::Fill(the_fill.clone())))
            .await
            .unwrap();
    }

    let ledger = h.ledger.lock().unwrap();
    let position = ledger.position("m1").unwrap();
    assert_eq!(position.shares, dec!(100));
    assert_eq!(position.cost, dec!(44));
}

#[tokio::test]
async fn test_take_profit_exit_releases_budget() {
    let mut cfg = config(&["m1"]);
    cfg.ledger = LedgerConfig {
        stop_loss_pct: Some(dec!(0.30)),
        take_profit_pct: Some(dec!(0.15)),
    };
    let mut h = worker_harness(cfg).await;
    h.risk.authorize("m1", dec!(44)).unwrap();
    h.worker
        .handle(MarketEvent::Gateway(GatewayEvent::Fill(fill(
            OrderId::new_v4(),
            dec!(0.44),
            dec!(44),
        ))))
        .await
        .unwrap();

    // NO bid = 1 - 0.49 = 0.51 -> +15.9% on a 0.44 entry
    h.worker
        .handle(MarketEvent::Book(snap("m1", 1, dec!(0.47), dec!(0.49))))
        .await
        .unwrap();

    let ledger = h.ledger.lock().unwrap();
    assert!(ledger.position("m1").is_none());
    let closed = &ledger.closed()[0];
    assert_eq!(closed.reason, CloseReason::TakeProfit);
    assert_eq!(closed.realized_pnl, dec!(7));
    drop(ledger);
    assert!(!h.risk.has_reservation("m1"));
}

#[tokio::test]
async fn test_stop_loss_exit() {
    let mut cfg = config(&["m1"]);
    cfg.ledger = LedgerConfig {
        stop_loss_pct: Some(dec!(0.30)),
        take_profit_pct: None,
    };
    let mut h = worker_harness(cfg).await;
    h.risk.authorize("m1", dec!(44)).unwrap();
    h.worker
        .handle(MarketEvent::Gateway(GatewayEvent::Fill(fill(
            OrderId::new_v4(),
            dec!(0.44),
            dec!(44),
        ))))
        .await
        .unwrap();

    // NO bid = 1 - 0.72 = 0.28 -> -36% on a 0.44 entry
    h.worker
        .handle(MarketEvent::Book(snap("m1", 1, dec!(0.70), dec!(0.72))))
        .await
        .unwrap();

    let ledger = h.ledger.lock().unwrap();
    assert_eq!(ledger.closed()[0].reason, CloseReason::StopLoss);
    drop(ledger);
    assert!(!h.risk.has_reservation("m1"));
}

#[test]
fn test_snapshot_wire_decode() {
    // Shape of the JSON a connector pushes onto the bus
    let json = r#"{
        "market_id": "m1",
        "seq": 42,
        "timestamp": "2026-08-25T12:00:00Z",
        "yes_bids": [{"price": "0.55", "size": "200"}],
        "yes_asks": [{"price": "0.57", "size": "150"}]
    }"#;
    let snap: OrderBookSnapshot = serde_json::from_str(json).unwrap();
    assert_eq!(snap.seq, 42);
    assert_eq!(snap.best_bid(Side::Yes), Some(dec!(0.55)));
    assert_eq!(snap.best_bid(Side::No), Some(dec!(0.43)));
}
