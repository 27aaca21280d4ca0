//! The collaborator `sendEvent` executes against when it runs inline.
//!
//! Kept as a trait object (mirroring `neuron-tool::ToolDyn`) rather
//! than a concrete HTTP client so this crate stays free of networking
//! dependencies — `inngest`'s `EventClient` is the real implementation.

use async_trait::async_trait;
use inngest_types::{Event, SerializedError};

/// Sends a batch of events and returns the ids the orchestrator
/// assigned to them, in order.
#[async_trait]
pub trait EventSender: Send + Sync {
    /// Send `events`, returning their assigned ids.
    async fn send(&self, events: &[Event]) -> Result<Vec<String>, SerializedError>;
}
