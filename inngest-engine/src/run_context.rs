//! [`RunContext`] — the value handed to user function handlers (§3).

use inngest_middleware::RunContextExt;
use inngest_step::StepContext;
use inngest_types::Event;

/// Everything a function handler sees for one invocation.
///
/// Built once per engine invocation (§3 "Lifecycles"): the triggering
/// event, the full batch when applicable, identifying metadata, the
/// step toolkit bound to this invocation's memo, and whatever
/// middleware's `transformInput` hooks contributed. Mutated only by
/// `transformInput` before the handler runs; read-only thereafter.
#[non_exhaustive]
#[derive(Clone)]
pub struct RunContext {
    /// The event that triggered this run.
    pub event: Event,
    /// The full event batch, when this function consumes batches.
    pub events: Vec<Event>,
    /// The orchestrator-assigned run id.
    pub run_id: String,
    /// This attempt's number, starting at zero.
    pub attempt: u32,
    /// The durable step toolkit bound to this invocation.
    pub step: StepContext,
    /// Additions contributed by middleware `transformInput` hooks.
    pub ext: RunContextExt,
}

impl RunContext {
    /// Construct a context with no middleware-contributed extensions.
    pub fn new(event: Event, events: Vec<Event>, run_id: impl Into<String>, attempt: u32, step: StepContext) -> Self {
        Self {
            event,
            events,
            run_id: run_id.into(),
            attempt,
            step,
            ext: RunContextExt::new(),
        }
    }
}
