//! Order execution
//!
//! The [`ExecutionGateway`] trait is the seam to the venue: intents go down,
//! acknowledgments, fills, and rejects come back asynchronously. The
//! [`OrderPlacementEngine`] sits above the gateway and owns maker pricing,
//! queue tracking, and the cancel/replace lifecycle.

mod paper;
mod placement;
mod types;

pub use paper::{PaperConfig, PaperGateway};
pub use placement::{OrderPlacementEngine, PlacementConfig, PlacementUpdate};
pub use types::{
    Fill, FillId, GatewayEvent, IntentAction, InvalidTransition, Order, OrderId, OrderIntent,
    OrderState, RejectReason,
};

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Venue-side order entry
///
/// Submission is fire-and-forget; outcomes arrive on the event stream.
/// Implementations must deliver fills at least once and tag every event with
/// its market id so the orchestrator can route it.
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    /// Submit a place/cancel/replace intent
    async fn submit(&self, intent: OrderIntent) -> anyhow::Result<()>;

    /// Subscribe to the asynchronous gateway event stream
    async fn events(&self) -> anyhow::Result<mpsc::Receiver<GatewayEvent>>;
}
