//! Risk management module
//!
//! Portfolio budget, the check-and-reserve gate, and pluggable sizing.

mod budget;
mod manager;
mod sizing;
mod types;

pub use budget::{CorrelationGroup, RiskBudget};
pub use manager::RiskManager;
pub use sizing::{create_sizer, FixedSizer, FractionalEdgeSizer, PositionSizer};
pub use types::RiskError;
