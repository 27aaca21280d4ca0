//! Per-method input/output shapes for the step toolkit.

use inngest_types::{AppId, DurationSpec, Event, FunctionDefinition, FunctionId, TimeSpec, TimeSpecError, Trigger};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Either a duration (`sleep`) or absolute timestamp (`sleepUntil`,
/// `waitForEvent` timeout), normalized to the orchestrator's wire
/// string before it becomes part of an `Op`'s `opts`.
#[derive(Debug, Clone)]
pub enum TimeoutSpec {
    /// A relative duration from "now".
    Duration(DurationSpec),
    /// An absolute instant.
    At(TimeSpec),
}

impl TimeoutSpec {
    /// Render the wire-format string the orchestrator expects in
    /// `opts.timeout`.
    pub fn to_wire_string(&self) -> String {
        match self {
            Self::Duration(d) => d.to_wire_string(),
            Self::At(t) => t.to_wire_string(),
        }
    }
}

impl TryFrom<&str> for TimeoutSpec {
    type Error = TimeSpecError;

    /// Accepts either a humantime duration (`"1m"`) or an RFC-3339
    /// timestamp, trying duration first since it is by far the common
    /// case for `sleep`/`waitForEvent`.
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        if let Ok(d) = DurationSpec::try_from(s) {
            return Ok(Self::Duration(d));
        }
        TimeSpec::try_from(s).map(Self::At)
    }
}

impl From<DurationSpec> for TimeoutSpec {
    fn from(d: DurationSpec) -> Self {
        Self::Duration(d)
    }
}

impl From<TimeSpec> for TimeoutSpec {
    fn from(t: TimeSpec) -> Self {
        Self::At(t)
    }
}

/// The match condition for `waitForEvent`: either a dot-path field
/// name (compiled to `event.<path> == async.<path>`) or a raw
/// CEL-like expression. Mutually exclusive by construction.
#[derive(Debug, Clone)]
pub enum MatchCondition {
    /// A dot-path shorthand, e.g. `"user.id"`.
    Field(String),
    /// A raw expression, e.g. `"event.user.id == async.user.id"`.
    Expr(String),
}

impl MatchCondition {
    /// Compile this condition to the raw `if` expression string the
    /// orchestrator evaluates. This crate never evaluates the
    /// expression itself.
    pub fn compile(&self) -> String {
        match self {
            Self::Field(path) => format!("event.{path} == async.{path}"),
            Self::Expr(expr) => expr.clone(),
        }
    }
}

/// Input to [`crate::context::StepContext::wait_for_event`].
#[derive(Debug, Clone)]
pub struct WaitForEventInput {
    /// The event name to wait for.
    pub event: String,
    /// How long to wait before giving up.
    pub timeout: TimeoutSpec,
    /// Optional match condition, compiled into `opts.if`.
    pub condition: Option<MatchCondition>,
}

impl WaitForEventInput {
    /// Wait for `event` with no match condition.
    pub fn new(event: impl Into<String>, timeout: impl Into<TimeoutSpec>) -> Self {
        Self {
            event: event.into(),
            timeout: timeout.into(),
            condition: None,
        }
    }

    /// Attach a match condition.
    #[must_use]
    pub fn matching(mut self, condition: MatchCondition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Return value of `sendEvent`: the ids the orchestrator assigned to
/// the sent events, plus any extra fields middleware attached.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SendEventOutput {
    /// Ids assigned to each sent event, in order.
    pub ids: Vec<String>,
    /// Extra fields contributed by `transformOutput` middleware.
    #[serde(flatten)]
    pub extra: Value,
}

/// The function `invoke` should target (§4.2): a local definition
/// resolved against this app's id, an already fully-qualified
/// `"<appId>-<fnId>"` string, or an explicit id/app reference.
#[derive(Debug, Clone)]
pub enum InvokeTarget {
    /// A function defined in this same app. Its id is resolved against
    /// the caller's configured app id; its own trigger is consulted to
    /// validate `data` (cron-triggered targets take no payload).
    Local(FunctionDefinition),
    /// An already fully-qualified `"<appId>-<fnId>"` string, passed
    /// through verbatim.
    Qualified(String),
    /// An explicit function id, optionally scoped to another app. When
    /// `app_id` is `None`, the caller's local app id is used if known.
    Reference {
        /// The target function's id.
        function_id: FunctionId,
        /// The app the target function belongs to, if not this one.
        app_id: Option<AppId>,
    },
}

impl InvokeTarget {
    /// Whether this target is known, from its own declared trigger, to
    /// be cron-scheduled. Only [`Self::Local`] carries enough
    /// information to answer this; other forms return `false` since the
    /// SDK has no visibility into the target's trigger.
    fn is_known_cron(&self) -> bool {
        match self {
            Self::Local(def) => def.triggers.iter().any(|t| matches!(t, Trigger::Cron { .. })),
            Self::Qualified(_) | Self::Reference { .. } => false,
        }
    }
}

/// Input to [`crate::context::StepContext::invoke`].
#[derive(Debug, Clone)]
pub struct InvokeInput {
    /// The function to invoke.
    pub target: InvokeTarget,
    /// The payload to send. Required unless `target` is known to be
    /// cron-triggered, in which case it must be omitted (§4.2).
    pub data: Option<Value>,
    /// Optional timeout on the invocation.
    pub timeout: Option<TimeoutSpec>,
}

impl InvokeInput {
    /// Invoke a fully-qualified `"<appId>-<fnId>"` target with no
    /// payload and no timeout.
    pub fn new(qualified_function_id: impl Into<String>) -> Self {
        Self {
            target: InvokeTarget::Qualified(qualified_function_id.into()),
            data: None,
            timeout: None,
        }
    }

    /// Invoke a local function definition, resolved against the
    /// caller's configured app id.
    pub fn local(definition: FunctionDefinition) -> Self {
        Self {
            target: InvokeTarget::Local(definition),
            data: None,
            timeout: None,
        }
    }

    /// Invoke by id/app reference.
    pub fn reference(function_id: impl Into<FunctionId>, app_id: Option<AppId>) -> Self {
        Self {
            target: InvokeTarget::Reference {
                function_id: function_id.into(),
                app_id,
            },
            data: None,
            timeout: None,
        }
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Validate `data` against what is known about `target`'s trigger
    /// (§4.2): a cron target must not carry a payload; anything else
    /// whose trigger this SDK cannot see is left to the orchestrator to
    /// reject.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.target.is_known_cron() && self.data.is_some() {
            return Err("invoke: a cron-triggered target must not be given `data`".to_string());
        }
        Ok(())
    }
}

/// Input to [`crate::context::StepContext::ai_infer`].
#[derive(Debug, Clone)]
pub struct AiInferInput {
    /// Request body format understood by the gateway, e.g.
    /// `"openai-chat"`.
    pub format: String,
    /// Upstream provider identifier.
    pub provider: String,
    /// Upstream URL.
    pub url: String,
    /// Auth key forwarded to the provider.
    pub auth_key: String,
    /// The model to use. If `body` omits `model`, this is injected.
    pub model: String,
    /// The request body. `model` is injected if absent.
    pub body: Value,
}

impl AiInferInput {
    /// Finalize the request body, injecting `model` if the caller's
    /// body did not already set one (§4.2: "if `body.model` is absent,
    /// inject the model's default").
    pub fn resolved_body(&self) -> Value {
        let mut body = self.body.clone();
        if let Value::Object(map) = &mut body {
            map.entry("model")
                .or_insert_with(|| Value::String(self.model.clone()));
        }
        body
    }
}

/// Passed to [`crate::context::StepContext::run`]'s closure: the
/// wrapped function's payload, re-exported for symmetry with
/// `ai.wrap`, which takes the same shape. Most `run` callers ignore
/// this and close over their own state instead.
pub type RunInput = Event;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_match_compiles_to_dot_path_equality() {
        let c = MatchCondition::Field("user.id".to_string());
        assert_eq!(c.compile(), "event.user.id == async.user.id");
    }

    #[test]
    fn expr_match_passes_through_unchanged() {
        let c = MatchCondition::Expr("event.a == async.b".to_string());
        assert_eq!(c.compile(), "event.a == async.b");
    }

    #[test]
    fn ai_infer_injects_default_model_when_absent() {
        let input = AiInferInput {
            format: "openai-chat".into(),
            provider: "openai".into(),
            url: "https://api.openai.com/v1/chat/completions".into(),
            auth_key: "sk-test".into(),
            model: "gpt-4o".into(),
            body: serde_json::json!({"messages": []}),
        };
        let body = input.resolved_body();
        assert_eq!(body["model"], "gpt-4o");
    }

    #[test]
    fn ai_infer_respects_explicit_model() {
        let input = AiInferInput {
            format: "openai-chat".into(),
            provider: "openai".into(),
            url: "https://api.openai.com/v1/chat/completions".into(),
            auth_key: "sk-test".into(),
            model: "gpt-4o".into(),
            body: serde_json::json!({"model": "gpt-4o-mini"}),
        };
        let body = input.resolved_body();
        assert_eq!(body["model"], "gpt-4o-mini");
    }

    #[test]
    fn timeout_spec_prefers_duration_parsing() {
        let t = TimeoutSpec::try_from("1m").unwrap();
        assert_eq!(t.to_wire_string(), "60000ms");
    }
}
