//! sweepfade: Liquidity-sweep fade engine for binary prediction markets
//!
//! This library provides the core components for:
//! - Decayed baseline price and volatility tracking per market
//! - Spike detection gated by sweep size and per-market cooldown
//! - Atomic check-and-reserve risk gating with correlation groups
//! - Maker-only order placement with queue tracking and cancel/replace
//! - Fill-deduplicating position ledger with resolution settlement
//! - Per-market serialized event orchestration
//! - Structured logging and Prometheus metrics

pub mod baseline;
pub mod cli;
pub mod config;
pub mod engine;
pub mod execution;
pub mod feed;
pub mod ledger;
pub mod market;
pub mod risk;
pub mod spike;
pub mod telemetry;
