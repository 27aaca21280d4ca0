//! Errors the execution engine can raise or wrap (§7).

use inngest_middleware::MiddlewareError;
use inngest_step::StepError;
use inngest_types::{NonRetriableError, SerializedError};
use thiserror::Error;

/// The error type a [`crate::handler::FunctionHandler`] body propagates
/// with `?`. Wraps every error a handler can encounter — a suspended
/// step, a memoized step failure the handler didn't catch, an
/// explicitly non-retriable failure, or a plain user error — so the
/// engine can tell them apart after the handler returns.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Propagated from a `step.*` call: either the suspension sentinel
    /// or a memoized step error the handler did not catch.
    #[error(transparent)]
    Step(#[from] StepError),

    /// The handler explicitly opted out of retries.
    #[error(transparent)]
    NonRetriable(#[from] NonRetriableError),

    /// A plain user function error, retriable by default.
    #[error(transparent)]
    Other(#[from] SerializedError),
}

impl HandlerError {
    /// Whether this is the suspension sentinel (as opposed to a
    /// genuine, user-observable error).
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Step(StepError::Interrupt))
    }
}

/// Errors surfaced by the engine itself, independent of user code.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EngineError {
    /// A middleware hook raised an error. Carries the `source:
    /// "middleware"` tag from §4.4/§7.
    #[error("middleware error: {0}")]
    Middleware(#[from] MiddlewareError),

    /// The handler suspended (interrupt) without any pending op having
    /// been recorded — an internal assertion failure (§7).
    #[error("No operation was submitted by a tool")]
    NoOperationSubmitted,

    /// Two ops within the same run hashed to the same id despite
    /// distinct positions — treated as a user error per §4.1, but
    /// surfaced distinctly since it indicates a sha1 collision or a
    /// toolkit bug rather than a normal replay mismatch.
    #[error("hash collision: step id {0:?} was already planned or run this invocation")]
    HashCollision(String),
}

impl EngineError {
    /// Build the rejection this error becomes when reported to the
    /// orchestrator: always non-retriable, since every `EngineError`
    /// variant indicates a bug rather than a transient condition.
    pub fn into_serialized(self) -> SerializedError {
        SerializedError::new(self.to_string()).with_name("EngineError")
    }
}
