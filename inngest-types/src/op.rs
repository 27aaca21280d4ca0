//! The Op model (§4.1) — the canonical representation of a step's
//! identity, kind, options, data, and error.

use crate::canonical::sha1_hex;
use crate::error::SerializedError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminates what kind of step an [`Op`] represents.
///
/// `StepPlanned` with a missing `type`/`op` field is treated as a plain
/// `run` by the orchestrator (§9 open question, preserved here for
/// backward compatibility — `OpCode` always serializes its tag
/// explicitly, but deserialization of an absent tag should not be
/// relied upon by callers of this crate).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum OpCode {
    /// A `run`/`sendEvent`/`ai.wrap` step to be scheduled by the
    /// orchestrator.
    StepPlanned,
    /// Marker used only in memo entries: this step ran and has
    /// data/error.
    StepRun,
    /// Orchestrator parks the run until the given time.
    Sleep,
    /// Orchestrator waits for a matching event or timeout.
    WaitForEvent,
    /// Orchestrator invokes another function and returns its result.
    InvokeFunction,
    /// Orchestrator proxies an AI inference request.
    AiGateway,
    /// Orchestrator proxies a generic HTTP fetch.
    Gateway,
}

/// Per-`OpCode` options. Each variant's required fields mirror the
/// table in spec.md §4.1.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OpOpts {
    /// No options (`StepPlanned`, `StepRun`).
    None(EmptyOpts),
    /// `Sleep` options.
    Sleep {
        /// Humantime duration string or ISO-8601 timestamp.
        timeout: String,
    },
    /// `WaitForEvent` options.
    WaitForEvent {
        /// The event name to wait for.
        event: String,
        /// Humantime duration string or ISO-8601 timestamp.
        timeout: String,
        /// CEL-like expression compiled from `match`/`if`. Evaluated by
        /// the orchestrator, never by this SDK.
        #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
        if_expr: Option<String>,
    },
    /// `InvokeFunction` options.
    InvokeFunction {
        /// Fully-qualified `"<appId>-<fnId>"` or resolved local id.
        function_id: String,
        /// Payload forwarded to the invoked function. Omitted for
        /// cron-triggered targets.
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
        /// Optional invocation timeout.
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout: Option<String>,
    },
    /// `AiGateway` options.
    AiGateway {
        /// Request body format (e.g. `"openai-chat"`, `"anthropic"`).
        format: String,
        /// Upstream provider identifier.
        provider: String,
        /// Upstream URL the orchestrator should call.
        url: String,
        /// Auth key forwarded to the provider, never logged.
        auth_key: String,
        /// The request body to forward.
        body: Value,
        /// Extra headers to forward.
        #[serde(default)]
        headers: std::collections::BTreeMap<String, String>,
    },
    /// `Gateway` options (generic HTTP fetch).
    Gateway {
        /// HTTP method.
        method: String,
        /// Target URL.
        url: String,
        /// Extra headers to forward.
        #[serde(default)]
        headers: std::collections::BTreeMap<String, String>,
        /// Optional request body.
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<Value>,
    },
}

/// Marker type for Ops with no `opts`. A unit struct rather than `()`
/// so it still serializes as `{}` (the shape the orchestrator expects)
/// instead of `null`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyOpts;

/// An Op — a declarative request from user code to the orchestrator:
/// "please do X, then call me back with the result in
/// `steps[hashedId]`."
///
/// Ops are value objects; once emitted they are never mutated.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Op {
    /// The hashed step identity (§4.2). Computed from `{pos, op, name,
    /// opts}` — never from `data`/`error`.
    pub id: String,

    /// Human-readable display label. The raw user-supplied step id
    /// travels here, not in `id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Optional machine-readable name, distinct from `display_name`
    /// (some tools, e.g. `sendEvent`, set both).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// What kind of step this is.
    pub op: OpCode,

    /// Per-kind options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opts: Option<OpOpts>,

    /// The step's result data, once it has run. Never part of the hash.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// The step's error, once it has run and failed. Never part of the
    /// hash.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SerializedError>,
}

impl Op {
    /// Build the hash input per §4.1: `{pos, op, name, opts}` in that
    /// canonical shape — `data`/`error` never participate.
    fn hash_input(pos: u32, op: OpCode, name: &str, opts: &Option<OpOpts>) -> Value {
        serde_json::json!({
            "pos": pos,
            "op": op,
            "name": name,
            "opts": opts,
        })
    }

    /// Compute the hashed id for a step at position `pos` with the
    /// given user-supplied name, op kind, and options.
    ///
    /// This is the single source of truth for step identity hashing —
    /// every toolkit method in `inngest-step` must route through this
    /// function so hashes stay consistent across the crate boundary.
    pub fn hash_id(pos: u32, op: OpCode, name: &str, opts: &Option<OpOpts>) -> String {
        sha1_hex(&Self::hash_input(pos, op, name, opts))
    }

    /// Construct a new, not-yet-run `Op`.
    pub fn new(
        pos: u32,
        op: OpCode,
        display_name: impl Into<String>,
        opts: Option<OpOpts>,
    ) -> Self {
        let display_name = display_name.into();
        let id = Self::hash_id(pos, op, &display_name, &opts);
        Self {
            id,
            display_name: Some(display_name),
            name: None,
            op,
            opts,
            data: None,
            error: None,
        }
    }

    /// Attach a result and return `self` (builder-style), used when an
    /// inline `run` step executes immediately (`step-ran`, §4.3).
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach an error and return `self`.
    #[must_use]
    pub fn with_error(mut self, error: SerializedError) -> Self {
        self.error = Some(error);
        self
    }
}

/// An entry in the orchestrator-maintained memo: a completed step's
/// result, keyed by hashed id.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoizedOp {
    /// The hashed id this entry resolves.
    pub id: String,
    /// The step's data, if it completed successfully.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// The step's error, if it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SerializedError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_hash_identically() {
        let a = Op::hash_id(0, OpCode::StepPlanned, "a", &None);
        let b = Op::hash_id(0, OpCode::StepPlanned, "a", &None);
        assert_eq!(a, b);
    }

    #[test]
    fn different_pos_changes_hash() {
        let a = Op::hash_id(0, OpCode::StepPlanned, "a", &None);
        let b = Op::hash_id(1, OpCode::StepPlanned, "a", &None);
        assert_ne!(a, b);
    }

    #[test]
    fn different_name_at_same_pos_changes_hash() {
        let a = Op::hash_id(0, OpCode::StepPlanned, "a", &None);
        let b = Op::hash_id(0, OpCode::StepPlanned, "b", &None);
        assert_ne!(a, b);
    }

    #[test]
    fn data_and_error_are_excluded_from_hash() {
        let op1 = Op::new(0, OpCode::StepPlanned, "a", None).with_data(serde_json::json!(1));
        let op2 = Op::new(0, OpCode::StepPlanned, "a", None).with_data(serde_json::json!(2));
        assert_eq!(op1.id, op2.id);
    }

    #[test]
    fn op_serializes_without_data_field_when_absent() {
        let op = Op::new(0, OpCode::StepPlanned, "a", None);
        let v = serde_json::to_value(&op).unwrap();
        assert!(v.get("data").is_none());
    }

    proptest::proptest! {
        #[test]
        fn hash_is_pure_function_of_inputs(pos in 0u32..10_000, name in "[a-zA-Z0-9_]{1,16}") {
            let a = Op::hash_id(pos, OpCode::StepPlanned, &name, &None);
            let b = Op::hash_id(pos, OpCode::StepPlanned, &name, &None);
            proptest::prop_assert_eq!(a, b);
        }
    }
}
