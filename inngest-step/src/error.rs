//! Error and suspension types returned by every toolkit method.

use inngest_types::SerializedError;
use thiserror::Error;

/// Every `step.*` call returns `Result<T, StepError>`. `Interrupt` is
/// the suspension sentinel: it carries no information of its own
/// (the newly planned op was already recorded on [`crate::context::StepContext`]
/// before it was returned) and exists purely so user code propagates
/// it with `?` like any other error, without the engine needing a
/// coroutine or panic-based unwind to stop the handler early.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StepError {
    /// The step this call represents has not yet run. The engine's
    /// replay driver is the only code that should construct or match
    /// on this variant directly — user code simply lets `?` propagate
    /// it up to the driver.
    #[error("step suspended, awaiting orchestrator")]
    Interrupt,

    /// The step ran (on a previous or this invocation) and its memo
    /// entry carried an error. This is what user `try`/`catch`-equivalent
    /// code actually observes and may handle.
    #[error("{0}")]
    StepFailed(SerializedError),

    /// A caller-supplied duration or timestamp could not be parsed.
    /// Always non-retriable.
    #[error("invalid duration or timestamp: {0}")]
    InvalidTimeSpec(#[from] inngest_types::TimeSpecError),

    /// `waitForEvent` was given both `match` and `if`, which are
    /// mutually exclusive.
    #[error("waitForEvent: `match` and `if` are mutually exclusive")]
    ConflictingMatchExpression,

    /// An `invoke` target was malformed: a cron-triggered function was
    /// given a payload, or a reference target carried an empty
    /// function id.
    #[error("invalid invoke target: {0}")]
    InvalidInvokeTarget(String),

    /// This invocation's id hashed to the same value as an op already
    /// planned or run this invocation (§4.1).
    #[error("hash collision: step id {0:?} was already planned or run this invocation")]
    HashCollision(String),

    /// A lifecycle hook raised an error while bracketing this step's
    /// memo lookup or execution.
    #[error("{0}")]
    Middleware(SerializedError),
}

impl StepError {
    /// Whether this is the suspension sentinel rather than a genuine
    /// user-observable error.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupt)
    }
}
