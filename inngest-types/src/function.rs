//! Function definitions and triggers, plus the shape the registration
//! payload serializes them into (§3, §8.1).

use crate::id::FunctionId;
use serde::{Deserialize, Serialize};

/// What causes a function to run.
///
/// The `if`/`match` expression in [`Trigger::Event`] is carried
/// verbatim as a string — this crate never evaluates it. Only the
/// orchestrator does.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Trigger {
    /// Runs whenever a matching event arrives.
    Event {
        /// The event name to match.
        event: String,
        /// An optional CEL-like expression further filtering matches.
        #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
        if_expr: Option<String>,
    },
    /// Runs on a cron schedule.
    Cron {
        /// A standard cron expression.
        cron: String,
    },
}

impl Trigger {
    /// Build an event trigger with no filter expression.
    pub fn event(name: impl Into<String>) -> Self {
        Self::Event {
            event: name.into(),
            if_expr: None,
        }
    }

    /// Build an event trigger filtered by a CEL-like expression.
    pub fn event_if(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self::Event {
            event: name.into(),
            if_expr: Some(expr.into()),
        }
    }

    /// Build a cron trigger.
    pub fn cron(expr: impl Into<String>) -> Self {
        Self::Cron { cron: expr.into() }
    }
}

/// Concurrency, rate-limiting, and retry knobs a function can declare.
/// All optional — absence means "use the orchestrator's defaults."
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FunctionConfig {
    /// Maximum number of concurrent runs, optionally scoped by key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<ConcurrencyConfig>,
    /// Maximum retry attempts before a run is marked failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    /// Rate limit applied to incoming trigger events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfig>,
    /// Batching configuration, if this function consumes batched events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_events: Option<BatchConfig>,
}

/// Concurrency limits, optionally scoped by a per-event key expression.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConcurrencyConfig {
    /// Maximum concurrent runs.
    pub limit: u32,
    /// Optional expression scoping the limit, e.g. `"event.data.userId"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Rate limit applied before a run is scheduled.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitConfig {
    /// Maximum number of runs within `period`.
    pub limit: u32,
    /// Humantime-formatted window, e.g. `"1m"`.
    pub period: String,
    /// Optional expression scoping the limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Event batching configuration.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchConfig {
    /// Maximum batch size.
    pub max_size: u32,
    /// Maximum time to wait for a batch to fill, humantime-formatted.
    pub timeout: String,
}

/// A function definition as supplied by app code. Handler logic itself
/// lives behind `inngest-step`'s `StepHandler` trait — this type only
/// carries metadata used for registration and dispatch lookup.
///
/// Middleware is deliberately not a field here: it is a behavior
/// (implemented against `inngest-middleware`'s `Middleware` trait, a
/// crate above this one in the workspace's dependency order, §2) and
/// so it is paired with a function's handler at registration time,
/// same as the handler itself — see `inngest-http::registry::RegisteredFunction`.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    /// The function's id, unique within its app.
    pub id: FunctionId,
    /// Optional human-readable name shown in the dashboard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// What triggers this function. At least one is required.
    pub triggers: Vec<Trigger>,
    /// Concurrency/retry/rate-limit/batch configuration.
    #[serde(flatten)]
    pub config: FunctionConfig,
    /// Declarative metadata for this function's failure handler, run
    /// when a terminal rejection occurs (§3). The handler body itself
    /// is paired separately at registration, not carried here.
    #[serde(rename = "onFailure", skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<Box<FunctionDefinition>>,
}

impl FunctionDefinition {
    /// Construct a function definition with a single trigger and no
    /// extra configuration.
    pub fn new(id: impl Into<FunctionId>, trigger: Trigger) -> Self {
        Self {
            id: id.into(),
            name: None,
            triggers: vec![trigger],
            config: FunctionConfig::default(),
            on_failure: None,
        }
    }

    /// Attach failure-handler metadata, nesting under `onFailure` on
    /// the wire.
    #[must_use]
    pub fn with_on_failure(mut self, on_failure: FunctionDefinition) -> Self {
        self.on_failure = Some(Box::new(on_failure));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_trigger_without_filter_omits_if() {
        let t = Trigger::event("demo/hello.world");
        let v = serde_json::to_value(&t).unwrap();
        assert!(v.get("if").is_none());
        assert_eq!(v["event"], "demo/hello.world");
    }

    #[test]
    fn cron_trigger_serializes_distinctly() {
        let t = Trigger::cron("0 * * * *");
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["cron"], "0 * * * *");
    }

    #[test]
    fn function_definition_flattens_config() {
        let mut def = FunctionDefinition::new("my-fn", Trigger::event("demo/hello.world"));
        def.config.retries = Some(3);
        let v = serde_json::to_value(&def).unwrap();
        assert_eq!(v["retries"], 3);
    }
}
