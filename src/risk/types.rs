//! Risk management types

use crate::market::GroupId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Reasons a candidate order is rejected by the risk gate
///
/// Rejection is expected and never fatal: the candidate is logged and
/// skipped, and the next qualifying tick is evaluated fresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RiskError {
    /// An open position already exists in this market
    #[error("Open position already exists in this market")]
    DuplicatePosition,
    /// Concurrent position cap reached
    #[error("Maximum concurrent positions reached")]
    MaxPositionsReached,
    /// Correlation-group exposure cap would be exceeded
    #[error("Correlation group {group} exposure cap exceeded")]
    CorrelationCapExceeded { group: GroupId },
    /// Candidate size exceeds the per-position cap
    #[error("Size {0} exceeds per-position cap")]
    SizeCapExceeded(Decimal),
}
