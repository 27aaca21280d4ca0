//! The middleware trait hierarchy (§4.4).
//!
//! `Middleware::on_function_run` mirrors the source SDK's factory
//! function: called once per run, it returns a fresh
//! [`FunctionRunHooks`] instance that owns whatever per-run state the
//! middleware needs (the JS source closes over local variables inside
//! the returned handlers object; here that state lives on the struct
//! the factory returns). `Middleware::on_send_event` does the same for
//! outbound event sends.
//!
//! This crate does not depend on `inngest-step`/`inngest-engine` —
//! hooks operate on the neutral [`FunctionRunMeta`]/[`CtxPatch`]/
//! [`OutputResult`] shapes so the dependency order stays leaves-first
//! (§2). `inngest-engine` is what threads these into the real
//! `RunContext`/`StepContext`.

use crate::context::CtxPatch;
use crate::error::MiddlewareError;
use async_trait::async_trait;
use inngest_types::{Event, SerializedError};
use serde_json::Value;

/// Read-only metadata describing the run a `FunctionRunHooks` instance
/// was created for. Stands in for the source SDK's `{fnDef, ctx, steps,
/// reqArgs}` factory argument.
#[derive(Debug, Clone)]
pub struct FunctionRunMeta {
    /// The triggering function's id.
    pub fn_id: String,
    /// The orchestrator-assigned run id.
    pub run_id: String,
    /// This attempt's number, starting at zero.
    pub attempt: u32,
    /// The event that triggered this run.
    pub event: Event,
    /// The full batch of events, when this function consumes batches.
    pub events: Vec<Event>,
}

/// The `{data?, error?}` shape `transformOutput` receives and may
/// replace (§4.4).
#[derive(Debug, Clone, Default)]
pub struct OutputResult {
    /// The handler's successful return value, if any.
    pub data: Option<Value>,
    /// The handler's terminal error, if any.
    pub error: Option<SerializedError>,
}

/// The outgoing wire payload `beforeResponse` may still mutate, after
/// `transformOutput` has already run.
#[derive(Debug, Clone)]
pub struct ResponsePayload {
    /// The JSON body about to be sent to the orchestrator.
    pub body: Value,
}

/// Per-run lifecycle hooks, in the order the engine invokes them (§4.3,
/// §4.4). Every method defaults to a no-op so implementors only
/// override what they need.
#[async_trait]
pub trait FunctionRunHooks: Send + Sync {
    /// Contribute additions to the run context before the handler
    /// executes. Patches from different middleware merge; the same key
    /// from a later middleware overwrites an earlier one (§8).
    async fn transform_input(&self) -> Result<CtxPatch, MiddlewareError> {
        Ok(CtxPatch::empty())
    }

    /// Called immediately before the engine consults the memo for the
    /// first step call of this run.
    async fn before_memoization(&self) -> Result<(), MiddlewareError> {
        Ok(())
    }

    /// Called immediately after the engine has finished replaying
    /// memoized steps (i.e. once fresh, un-memoized work begins).
    async fn after_memoization(&self) -> Result<(), MiddlewareError> {
        Ok(())
    }

    /// Called immediately before a step or the handler body executes
    /// new (non-memoized) work.
    async fn before_execution(&self) -> Result<(), MiddlewareError> {
        Ok(())
    }

    /// Called immediately after new work has executed.
    async fn after_execution(&self) -> Result<(), MiddlewareError> {
        Ok(())
    }

    /// Transform the handler's `{data, error}` result. Hooks run in
    /// *reverse* registration order (§4.4) — the last-registered
    /// middleware sees the result first and its transformation is seen
    /// by everything registered before it.
    async fn transform_output(
        &self,
        result: OutputResult,
    ) -> Result<OutputResult, MiddlewareError> {
        Ok(result)
    }

    /// Last chance to mutate the outgoing response body before it is
    /// serialized and signed. Also runs in reverse registration order.
    async fn before_response(
        &self,
        payload: ResponsePayload,
    ) -> Result<ResponsePayload, MiddlewareError> {
        Ok(payload)
    }
}

/// A `FunctionRunHooks` that does nothing at every stage — the default
/// a [`Middleware`] may return when it has nothing to contribute for a
/// particular run.
pub struct NoopFunctionRunHooks;

#[async_trait]
impl FunctionRunHooks for NoopFunctionRunHooks {}

/// Hooks around an outbound `sendEvent` call (§4.4).
#[async_trait]
pub trait SendEventHooks: Send + Sync {
    /// Transform the events about to be sent.
    async fn transform_input(&self, events: Vec<Event>) -> Result<Vec<Event>, MiddlewareError> {
        Ok(events)
    }

    /// Transform the `{ids}` result after the events were sent. Runs in
    /// reverse registration order, same as function-run's
    /// `transformOutput`.
    async fn transform_output(&self, ids: Vec<String>) -> Result<Vec<String>, MiddlewareError> {
        Ok(ids)
    }
}

/// No-op event-send hooks.
pub struct NoopSendEventHooks;

#[async_trait]
impl SendEventHooks for NoopSendEventHooks {}

/// A registered middleware. Implementors are factories: each call to
/// `on_function_run`/`on_send_event` is invoked at most once per
/// logical event (§4.4 "Guarantees") and returns a hooks object scoped
/// to that single run or send.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// A human-readable name, used in error annotations and tracing.
    fn name(&self) -> &str;

    /// Build the hooks for one function run.
    async fn on_function_run(
        &self,
        meta: &FunctionRunMeta,
    ) -> Result<Box<dyn FunctionRunHooks>, MiddlewareError> {
        let _ = meta;
        Ok(Box::new(NoopFunctionRunHooks))
    }

    /// Build the hooks for one outbound event send.
    async fn on_send_event(&self) -> Result<Box<dyn SendEventHooks>, MiddlewareError> {
        Ok(Box::new(NoopSendEventHooks))
    }
}
