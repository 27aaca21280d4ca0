//! The sum type an execution returns to the HTTP handler (§4.3),
//! mirroring the shape of `neuron-loop::step::TurnResult`.

use crate::error::{NonRetriableError, SerializedError};
use crate::op::Op;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The outcome of driving one function invocation to the point where
/// it either finishes or must suspend and report back to the
/// orchestrator.
///
/// Exactly one of these is returned per HTTP request handled by
/// `inngest-http`; which variant dictates the response's shape and
/// status code (§6.2).
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResult {
    /// One or more new steps were discovered and must be scheduled by
    /// the orchestrator before execution can continue. Corresponds to
    /// HTTP 206.
    StepsPlanned {
        /// The newly discovered, not-yet-run steps, in discovery order.
        ops: Vec<Op>,
    },

    /// A single step ran inline (opportunistic execution, §4.3) and its
    /// result is being reported back immediately. Corresponds to
    /// HTTP 206.
    StepRan {
        /// The step that ran, including `data` or `error`.
        op: Op,
    },

    /// The function handler returned successfully. Corresponds to
    /// HTTP 200.
    FunctionResolved {
        /// The handler's return value.
        data: Value,
    },

    /// The function handler returned an error that should not be
    /// retried, or all retries have been exhausted. Corresponds to
    /// HTTP 500 with `{"error": ..., "status": "failed"}` semantics.
    FunctionRejected {
        /// The terminal error.
        error: SerializedError,
        /// Whether this rejection was explicitly marked non-retriable
        /// by the handler (vs. retries having been exhausted).
        non_retriable: bool,
    },

    /// The orchestrator's `requestedRunStep` did not match any op the
    /// replay discovered. Corresponds to HTTP 400.
    StepNotFound {
        /// The hashed id the orchestrator asked for.
        step_id: String,
    },
}

impl ExecutionResult {
    /// Build a [`ExecutionResult::FunctionRejected`] from a handler
    /// error that opted out of retries.
    pub fn non_retriable(err: NonRetriableError) -> Self {
        Self::FunctionRejected {
            error: err.inner,
            non_retriable: err.non_retriable,
        }
    }

    /// Build a [`ExecutionResult::FunctionRejected`] from a handler
    /// error whose retriability is determined elsewhere (e.g. attempt
    /// count exhausted).
    pub fn rejected(err: SerializedError, non_retriable: bool) -> Self {
        Self::FunctionRejected {
            error: err,
            non_retriable,
        }
    }

    /// Whether the orchestrator should schedule more work (as opposed
    /// to this being a terminal outcome for the run).
    pub fn requires_more_scheduling(&self) -> bool {
        matches!(self, Self::StepsPlanned { .. } | Self::StepRan { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::OpCode;

    #[test]
    fn steps_planned_tags_status_field() {
        let r = ExecutionResult::StepsPlanned { ops: vec![] };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["status"], "steps_planned");
    }

    #[test]
    fn step_ran_carries_the_op() {
        let op = Op::new(0, OpCode::StepPlanned, "a", None).with_data(serde_json::json!(42));
        let r = ExecutionResult::StepRan { op: op.clone() };
        assert!(r.requires_more_scheduling());
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["op"]["data"], 42);
    }

    #[test]
    fn function_resolved_does_not_require_more_scheduling() {
        let r = ExecutionResult::FunctionResolved {
            data: serde_json::json!({"ok": true}),
        };
        assert!(!r.requires_more_scheduling());
    }

    #[test]
    fn non_retriable_rejection_carries_flag() {
        let err = SerializedError::new("bad input").into_non_retriable();
        let r = ExecutionResult::non_retriable(err);
        match r {
            ExecutionResult::FunctionRejected { non_retriable, .. } => assert!(non_retriable),
            _ => panic!("expected FunctionRejected"),
        }
    }
}
