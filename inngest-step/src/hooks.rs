//! The seam this crate exposes for per-step middleware lifecycle
//! notifications, without depending on `inngest-middleware` itself
//! (§2 "leaves-first" dependency order — the same pattern
//! [`crate::sender::EventSender`] uses for outbound sends).
//!
//! `inngest-engine` adapts its `inngest_middleware::FunctionRunPipeline`
//! into this trait and attaches it to a [`crate::context::StepContext`],
//! so the four hooks fire at the actual memo-lookup/discovery/execution
//! transitions (§4.3) instead of once, up front, around the whole
//! handler call.

use async_trait::async_trait;
use inngest_types::SerializedError;

/// Per-step lifecycle notifications, bracketing the transitions a
/// function run passes through as it replays memoized steps and then
/// executes new work.
#[async_trait]
pub trait StepLifecycleHooks: Send + Sync {
    /// Fired once, immediately before the first step call of this
    /// invocation consults the memo.
    async fn before_memoization(&self) -> Result<(), SerializedError>;

    /// Fired once, immediately after the last memoized step replays —
    /// i.e. the first time a step call finds no memo entry and the
    /// invocation starts discovering new work.
    async fn after_memoization(&self) -> Result<(), SerializedError>;

    /// Fired immediately before a step executes new (non-memoized)
    /// work inline (the orchestrator's requested `run`/`ai.wrap` step).
    async fn before_execution(&self) -> Result<(), SerializedError>;

    /// Fired immediately after that inline execution completes,
    /// successfully or not.
    async fn after_execution(&self) -> Result<(), SerializedError>;
}
