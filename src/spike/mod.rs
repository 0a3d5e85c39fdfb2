//! Spike detection module
//!
//! Classified spike events from top-of-book deviation against the baseline,
//! gated by sweep size and a per-market cooldown.

mod detector;
mod types;

pub use detector::{SpikeConfig, SpikeDetector};
pub use types::{SpikeDirection, SpikeEvent};
