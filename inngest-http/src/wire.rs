//! Wire shapes exchanged with the orchestrator (§6): the function-run
//! request/response bodies, the registration payload, and the
//! introspection response. These are a direct port of the JSON shapes
//! into `serde`-derived structs, the way `inngest_types::op`/`event`
//! port the Op/Event shapes.

use inngest_step::Memo;
use inngest_types::{Event, FunctionConfig, FunctionDefinition, MemoizedOp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// `ctx.stack` on the run request: the orchestrator's view of
/// completion order, mostly informational for this SDK.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStack {
    /// Hashed ids in completion order.
    #[serde(default)]
    pub stack: Vec<String>,
    /// Index of the step currently being targeted, if any.
    #[serde(default)]
    pub current: Option<i64>,
}

/// `ctx` on the run request.
#[derive(Debug, Clone, Deserialize)]
pub struct RunCtx {
    /// The orchestrator-assigned run id.
    pub run_id: String,
    /// Completion-order bookkeeping; not consulted by the engine.
    #[serde(default)]
    pub stack: Option<RunStack>,
    /// This attempt's number, starting at zero.
    #[serde(default)]
    pub attempt: u32,
    /// The function this request targets.
    pub fn_id: String,
    /// When set, the orchestrator is asking this exact step to run
    /// inline (§4.3 "Inline execution mode").
    #[serde(default)]
    pub step_id: Option<String>,
}

/// The full `POST` run-step request body (§6).
#[derive(Debug, Clone, Deserialize)]
pub struct RunRequestBody {
    /// The event that triggered this run.
    pub event: Event,
    /// The full event batch.
    #[serde(default)]
    pub events: Vec<Event>,
    /// The memo: completed steps keyed by hashed id. Entries may be
    /// `{data?, error?}` objects, or — per §9's open question on the
    /// source's backward-compatible shape — a bare `JsonValue`, which
    /// this type normalizes into `data` at decode time via
    /// [`RunRequestBody::memo`].
    #[serde(default)]
    pub steps: HashMap<String, Value>,
    /// Run identifying metadata.
    pub ctx: RunCtx,
    /// Whether the orchestrator expects the SDK to fetch large step
    /// output via a side API rather than inline in the memo. Not
    /// exercised by this SDK's in-memory memo, carried for forward
    /// compatibility with the wire shape.
    #[serde(default)]
    pub use_api: bool,
    /// Protocol version.
    #[serde(default)]
    pub version: Option<i32>,
}

impl RunRequestBody {
    /// Build the typed [`Memo`] the engine consumes, normalizing any
    /// memo entry that isn't already a `{data?, error?}` object into
    /// plain `data` (§9 open question: source treats a bare JSON value
    /// as the step's data for backward compatibility).
    pub fn memo(&self) -> Memo {
        let mut entries = HashMap::with_capacity(self.steps.len());
        for (id, value) in &self.steps {
            let entry = match value {
                Value::Object(map) if map.contains_key("data") || map.contains_key("error") => {
                    let data = map.get("data").cloned();
                    let error = map
                        .get("error")
                        .and_then(|e| serde_json::from_value(e.clone()).ok());
                    MemoizedOp {
                        id: id.clone(),
                        data,
                        error,
                    }
                }
                other => MemoizedOp {
                    id: id.clone(),
                    data: Some(other.clone()),
                    error: None,
                },
            };
            entries.insert(id.clone(), entry);
        }
        Memo::new(entries)
    }
}

/// The registration payload sent on a `PUT` sync, in-band or
/// out-of-band (§6).
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationPayload {
    /// This app's serve endpoint URL.
    pub url: String,
    /// Protocol version string.
    pub v: String,
    /// Always `"ping"` for this deploy type.
    #[serde(rename = "deployType")]
    pub deploy_type: String,
    /// The framework adapter in use, e.g. `"axum"`.
    pub framework: String,
    #[serde(rename = "appName")]
    /// This app's name.
    pub app_name: String,
    /// Optional app version string.
    #[serde(rename = "appVersion", skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    /// SDK language/version tag, e.g. `"rust:v0.1.0"`.
    pub sdk: String,
    /// Every registered function's configuration.
    pub functions: Vec<RegisteredFunctionConfig>,
    /// `hex(sha256(canonical_json(self_without_hash)))`.
    pub hash: String,
    /// Declared SDK capabilities.
    pub capabilities: Capabilities,
}

/// One function's wire-facing registration shape: its definition plus
/// the resolved serve-path `#[serde(flatten)]`ed alongside it.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredFunctionConfig {
    /// The function's id.
    pub id: String,
    /// Optional human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Declared triggers.
    pub triggers: Vec<inngest_types::Trigger>,
    /// Concurrency/retry/rate-limit/batch configuration.
    #[serde(flatten)]
    pub config: FunctionConfig,
    /// This function's failure-handler metadata, if declared (§3).
    #[serde(rename = "onFailure", skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<Box<FunctionDefinition>>,
}

impl From<&FunctionDefinition> for RegisteredFunctionConfig {
    fn from(def: &FunctionDefinition) -> Self {
        Self {
            id: def.id.to_string(),
            name: def.name.clone(),
            triggers: def.triggers.clone(),
            config: def.config.clone(),
            on_failure: def.on_failure.clone(),
        }
    }
}

/// SDK capability flags advertised during registration.
#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    /// In-band sync protocol version supported.
    pub in_band_sync: String,
    /// Trust-probe protocol version supported.
    pub trust_probe: String,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            in_band_sync: "v1".to_string(),
            trust_probe: "v1".to_string(),
        }
    }
}

/// The `GET` introspection response body (§4.5).
#[derive(Debug, Clone, Serialize)]
pub struct IntrospectionResponse {
    /// Protocol schema version.
    pub schema_version: String,
    /// Whether the request's signature validated, when one was
    /// present. `None` when no auth was attempted (dev mode).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication_succeeded: Option<bool>,
    /// Number of registered functions.
    pub function_count: usize,
    /// Whether an event key is configured.
    pub has_event_key: bool,
    /// Whether a signing key is configured.
    pub has_signing_key: bool,
    /// `"dev"` or `"cloud"`.
    pub mode: String,
    /// This app's id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    /// The `INNGEST_ENV` branch/preview name, if set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    /// The framework adapter in use.
    pub framework: String,
    /// Always `"rust"`.
    pub sdk_language: String,
    /// This crate's version.
    pub sdk_version: String,
    /// Declared capabilities.
    pub capabilities: Capabilities,
}
