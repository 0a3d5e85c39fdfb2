//! Risk gating
//!
//! Single authority over the shared exposure counters. Authorization is an
//! atomic check-and-reserve: the counters are read and updated under one
//! lock, so two concurrent spike events in different markets cannot both be
//! admitted past the concurrent-position cap.

use crate::market::MarketId;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

use super::budget::RiskBudget;
use super::types::RiskError;

#[derive(Debug, Default)]
struct Counters {
    /// Reserved exposure per market (a working order or open position)
    exposure: HashMap<MarketId, Decimal>,
    /// Aggregate reserved exposure per correlation group
    group_exposure: HashMap<String, Decimal>,
}

/// Gates every prospective order against the portfolio risk budget
pub struct RiskManager {
    budget: RiskBudget,
    counters: Mutex<Counters>,
}

impl RiskManager {
    /// Create a manager for the given budget
    pub fn new(budget: RiskBudget) -> Self {
        Self {
            budget,
            counters: Mutex::new(Counters::default()),
        }
    }

    /// The budget this manager enforces
    pub fn budget(&self) -> &RiskBudget {
        &self.budget
    }

    /// Check and reserve exposure for a candidate order
    ///
    /// Checks in order: duplicate position, concurrent-position cap,
    /// correlation-group cap, per-position size cap. On success the exposure
    /// is reserved immediately; callers must [`release`](Self::release) on
    /// terminal cancel or position close.
    pub fn authorize(&self, market_id: &str, size: Decimal) -> Result<Decimal, RiskError> {
        let mut counters = self.counters.lock().expect("risk counters lock poisoned");

        if counters.exposure.contains_key(market_id) {
            return Err(RiskError::DuplicatePosition);
        }

        if counters.exposure.len() >= self.budget.max_concurrent_positions {
            return Err(RiskError::MaxPositionsReached);
        }

        let group = self.budget.group_of(market_id);
        if let Some(group) = group {
            let current = counters
                .group_exposure
                .get(&group.id)
                .copied()
                .unwrap_or(Decimal::ZERO);
            if current + size > group.exposure_cap {
                return Err(RiskError::CorrelationCapExceeded {
                    group: group.id.clone(),
                });
            }
        }

        if size > self.budget.max_position_size {
            return Err(RiskError::SizeCapExceeded(size));
        }

        counters.exposure.insert(market_id.to_string(), size);
        if let Some(group) = group {
            *counters
                .group_exposure
                .entry(group.id.clone())
                .or_insert(Decimal::ZERO) += size;
        }

        metrics::gauge!("sweepfade_open_positions").set(counters.exposure.len() as f64);
        Ok(size)
    }

    /// Release the reservation for a market, returning the freed exposure
    ///
    /// Releasing a market with no reservation is a no-op (idempotent against
    /// duplicate terminal events).
    pub fn release(&self, market_id: &str) -> Decimal {
        let mut counters = self.counters.lock().expect("risk counters lock poisoned");

        let Some(size) = counters.exposure.remove(market_id) else {
            return Decimal::ZERO;
        };

        if let Some(group) = self.budget.group_of(market_id) {
            if let Some(current) = counters.group_exposure.get_mut(&group.id) {
                *current -= size;
                if current.is_zero() {
                    counters.group_exposure.remove(&group.id);
                }
            }
        }

        metrics::gauge!("sweepfade_open_positions").set(counters.exposure.len() as f64);
        size
    }

    /// Number of markets with reserved exposure
    pub fn open_count(&self) -> usize {
        self.counters
            .lock()
            .expect("risk counters lock poisoned")
            .exposure
            .len()
    }

    /// Whether exposure is reserved for a market
    pub fn has_reservation(&self, market_id: &str) -> bool {
        self.counters
            .lock()
            .expect("risk counters lock poisoned")
            .exposure
            .contains_key(market_id)
    }

    /// Current aggregate exposure for a correlation group
    pub fn group_exposure(&self, group_id: &str) -> Decimal {
        self.counters
            .lock()
            .expect("risk counters lock poisoned")
            .group_exposure
            .get(group_id)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}
