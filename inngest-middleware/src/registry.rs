//! The ordered middleware pipeline (§4.4).
//!
//! [`MiddlewareRegistry`] holds middleware in registration order and
//! builds a per-run/per-send pipeline from it. Input-transforming hooks
//! run forward (first registered runs first); output-transforming
//! hooks run in reverse, so outer middleware sees inner middleware's
//! results on the way out — exactly the nesting a chain of
//! `tool_middleware_fn`/`Next` wrappers produces, just without the
//! explicit `Next` parameter since every hook here is independent
//! rather than wrapping the next call.

use crate::context::{CtxPatch, RunContextExt};
use crate::error::MiddlewareError;
use crate::hooks::{
    FunctionRunHooks, FunctionRunMeta, Middleware, OutputResult, ResponsePayload, SendEventHooks,
};
use inngest_types::Event;
use std::sync::Arc;

/// Ordered collection of registered middleware, shared (app-scoped) or
/// built fresh per function (function-scoped) — callers decide which
/// by choosing what they put in the `Vec` they pass to
/// [`MiddlewareRegistry::new`].
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    /// Build a registry from an ordered list of middleware.
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self { middlewares }
    }

    /// An empty registry — equivalent to no middleware configured.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append one more middleware to the end of the chain.
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Number of registered middleware.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Whether no middleware is registered.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// The underlying middleware list, in registration order. Used to
    /// merge an app-scoped registry with function-scoped middleware
    /// before building a run's pipeline (§4.4).
    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }

    /// Build the hooks for one function run by calling every
    /// middleware's `on_function_run` factory, in registration order.
    pub async fn build_function_run(
        &self,
        meta: &FunctionRunMeta,
    ) -> Result<FunctionRunPipeline, MiddlewareError> {
        let mut hooks = Vec::with_capacity(self.middlewares.len());
        for mw in &self.middlewares {
            hooks.push(mw.on_function_run(meta).await?);
        }
        Ok(FunctionRunPipeline { hooks })
    }

    /// Build the hooks for one outbound event send.
    pub async fn build_send_event(&self) -> Result<SendEventPipeline, MiddlewareError> {
        let mut hooks = Vec::with_capacity(self.middlewares.len());
        for mw in &self.middlewares {
            hooks.push(mw.on_send_event().await?);
        }
        Ok(SendEventPipeline { hooks })
    }
}

/// The live hook set for one function run, already resolved from every
/// registered middleware's factory.
pub struct FunctionRunPipeline {
    hooks: Vec<Box<dyn FunctionRunHooks>>,
}

impl FunctionRunPipeline {
    /// Run every `transformInput` hook forward, merging their patches
    /// into a fresh [`RunContextExt`].
    pub async fn transform_input(&self) -> Result<RunContextExt, MiddlewareError> {
        let mut ext = RunContextExt::new();
        for hook in &self.hooks {
            let patch: CtxPatch = hook.transform_input().await?;
            ext.merge(patch);
        }
        Ok(ext)
    }

    /// Fire every `beforeMemoization` hook, forward order.
    pub async fn before_memoization(&self) -> Result<(), MiddlewareError> {
        for hook in &self.hooks {
            hook.before_memoization().await?;
        }
        Ok(())
    }

    /// Fire every `afterMemoization` hook, forward order.
    pub async fn after_memoization(&self) -> Result<(), MiddlewareError> {
        for hook in &self.hooks {
            hook.after_memoization().await?;
        }
        Ok(())
    }

    /// Fire every `beforeExecution` hook, forward order.
    pub async fn before_execution(&self) -> Result<(), MiddlewareError> {
        for hook in &self.hooks {
            hook.before_execution().await?;
        }
        Ok(())
    }

    /// Fire every `afterExecution` hook, forward order.
    pub async fn after_execution(&self) -> Result<(), MiddlewareError> {
        for hook in &self.hooks {
            hook.after_execution().await?;
        }
        Ok(())
    }

    /// Run every `transformOutput` hook in reverse registration order.
    pub async fn transform_output(
        &self,
        mut result: OutputResult,
    ) -> Result<OutputResult, MiddlewareError> {
        for hook in self.hooks.iter().rev() {
            result = hook.transform_output(result).await?;
        }
        Ok(result)
    }

    /// Run every `beforeResponse` hook in reverse registration order.
    pub async fn before_response(
        &self,
        mut payload: ResponsePayload,
    ) -> Result<ResponsePayload, MiddlewareError> {
        for hook in self.hooks.iter().rev() {
            payload = hook.before_response(payload).await?;
        }
        Ok(payload)
    }
}

/// The live hook set for one outbound event send.
pub struct SendEventPipeline {
    hooks: Vec<Box<dyn SendEventHooks>>,
}

impl SendEventPipeline {
    /// Run every `transformInput` hook forward over the event batch.
    pub async fn transform_input(&self, mut events: Vec<Event>) -> Result<Vec<Event>, MiddlewareError> {
        for hook in &self.hooks {
            events = hook.transform_input(events).await?;
        }
        Ok(events)
    }

    /// Run every `transformOutput` hook in reverse over the assigned ids.
    pub async fn transform_output(&self, mut ids: Vec<String>) -> Result<Vec<String>, MiddlewareError> {
        for hook in self.hooks.iter().rev() {
            ids = hook.transform_output(ids).await?;
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoopSendEventHooks;
    use async_trait::async_trait;

    fn meta() -> FunctionRunMeta {
        FunctionRunMeta {
            fn_id: "fn".into(),
            run_id: "run-1".into(),
            attempt: 0,
            event: Event::new("demo/x", serde_json::json!({})),
            events: vec![],
        }
    }

    struct TagMiddleware {
        name: String,
        key: &'static str,
    }

    struct TagHooks {
        name: String,
        key: &'static str,
    }

    #[async_trait]
    impl FunctionRunHooks for TagHooks {
        async fn transform_input(&self) -> Result<CtxPatch, MiddlewareError> {
            Ok(CtxPatch::empty().with(self.key, self.name.clone()))
        }

        async fn transform_output(
            &self,
            mut result: OutputResult,
        ) -> Result<OutputResult, MiddlewareError> {
            let mut order: Vec<String> = result
                .data
                .as_ref()
                .and_then(|d| d.get("order"))
                .and_then(|v| v.as_array())
                .map(|a| {
                    a.iter()
                        .filter_map(|v| v.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default();
            order.push(self.name.clone());
            result.data = Some(serde_json::json!({"order": order}));
            Ok(result)
        }
    }

    #[async_trait]
    impl Middleware for TagMiddleware {
        fn name(&self) -> &str {
            &self.name
        }

        async fn on_function_run(
            &self,
            _meta: &FunctionRunMeta,
        ) -> Result<Box<dyn FunctionRunHooks>, MiddlewareError> {
            Ok(Box::new(TagHooks {
                name: self.name.clone(),
                key: self.key,
            }))
        }
    }

    #[tokio::test]
    async fn transform_input_merges_in_registration_order_last_wins() {
        let registry = MiddlewareRegistry::new(vec![
            Arc::new(TagMiddleware { name: "m1".into(), key: "k" }),
            Arc::new(TagMiddleware { name: "m2".into(), key: "k" }),
        ]);
        let pipeline = registry.build_function_run(&meta()).await.unwrap();
        let ext = pipeline.transform_input().await.unwrap();
        assert_eq!(ext.get::<String>("k").unwrap(), "m2");
    }

    #[tokio::test]
    async fn transform_output_runs_in_reverse_registration_order() {
        let registry = MiddlewareRegistry::new(vec![
            Arc::new(TagMiddleware { name: "m1".into(), key: "a" }),
            Arc::new(TagMiddleware { name: "m2".into(), key: "b" }),
        ]);
        let pipeline = registry.build_function_run(&meta()).await.unwrap();
        let result = pipeline.transform_output(OutputResult::default()).await.unwrap();
        let order = result.data.unwrap()["order"].clone();
        assert_eq!(order, serde_json::json!(["m2", "m1"]));
    }

    #[tokio::test]
    async fn empty_registry_produces_noop_pipeline() {
        let registry = MiddlewareRegistry::empty();
        let pipeline = registry.build_function_run(&meta()).await.unwrap();
        let ext = pipeline.transform_input().await.unwrap();
        assert!(ext.is_empty());
    }

    #[tokio::test]
    async fn send_event_pipeline_defaults_are_noop() {
        let registry = MiddlewareRegistry::empty();
        let pipeline = registry.build_send_event().await.unwrap();
        let events = vec![Event::new("a", serde_json::json!({}))];
        let out = pipeline.transform_input(events.clone()).await.unwrap();
        assert_eq!(out, events);
        let ids = pipeline.transform_output(vec!["1".into()]).await.unwrap();
        assert_eq!(ids, vec!["1".to_string()]);
        let _ = NoopSendEventHooks;
    }
}
