//! Baseline price tracking module
//!
//! Decayed reference price and volatility per market, with warm-up gating
//! and reset-on-gap semantics.

mod tracker;

pub use tracker::{BaselineConfig, BaselineState, BaselineTracker};
