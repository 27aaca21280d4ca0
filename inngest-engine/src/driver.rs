//! The replay-driven execution engine (§4.3) — the heart of durable
//! execution.
//!
//! Grounded on `neuron_loop::AgentLoop::run`'s drive-until-blocked-or-
//! resolved shape and `neuron_runtime::durable::DurableContext`'s
//! execute-or-replay split. Because Rust has no stable coroutine
//! facility, "concurrent branches" (§5) fall out of running the
//! handler as one `tokio` future and letting user code `join!` step
//! calls that all share the same `Arc<Mutex<EngineState>>` (built into
//! `inngest_step::StepContext`) rather than the engine explicitly
//! scheduling branches itself.

use crate::error::{EngineError, HandlerError};
use crate::handler::FunctionHandler;
use crate::run_context::RunContext;
use async_trait::async_trait;
use inngest_middleware::{CtxPatch, FunctionRunMeta, FunctionRunPipeline, MiddlewareRegistry, OutputResult, ResponsePayload};
use inngest_step::{EventSender, Memo, StepContext, StepLifecycleHooks};
use inngest_types::{AppId, Event, ExecutionResult, SerializedError};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Everything one call to [`Engine::run`] needs beyond the function
/// handler itself.
pub struct RunRequest {
    /// The triggering event.
    pub event: Event,
    /// The full event batch.
    pub events: Vec<Event>,
    /// The orchestrator-assigned run id.
    pub run_id: String,
    /// This attempt's number.
    pub attempt: u32,
    /// The function's id, for middleware metadata and logging.
    pub fn_id: String,
    /// The memoized step results the orchestrator has already
    /// recorded.
    pub memo: Memo,
    /// When set, the engine is in inline execution mode (§4.3):
    /// exactly the `run`/`ai.wrap` step with this hashed id may execute
    /// inline this invocation.
    pub requested_run_step: Option<String>,
    /// This app's id, for resolving `invoke` targets that name a local
    /// function or an unscoped reference (§4.2).
    pub local_app_id: Option<AppId>,
    /// The function's `onFailure` handler, if declared (§3). Invoked
    /// best-effort once this run terminally rejects; its own outcome is
    /// never folded back into this run's result.
    pub on_failure_handler: Option<Arc<dyn FunctionHandler>>,
}

/// Adapts a resolved [`FunctionRunPipeline`] to the narrow
/// [`StepLifecycleHooks`] seam `inngest-step` exposes, so the four
/// lifecycle hooks can be attached to a [`StepContext`] without that
/// crate depending on `inngest-middleware` (§2).
struct PipelineHooks {
    pipeline: Arc<FunctionRunPipeline>,
}

#[async_trait]
impl StepLifecycleHooks for PipelineHooks {
    async fn before_memoization(&self) -> Result<(), SerializedError> {
        self.pipeline.before_memoization().await.map_err(|e| e.into_serialized())
    }

    async fn after_memoization(&self) -> Result<(), SerializedError> {
        self.pipeline.after_memoization().await.map_err(|e| e.into_serialized())
    }

    async fn before_execution(&self) -> Result<(), SerializedError> {
        self.pipeline.before_execution().await.map_err(|e| e.into_serialized())
    }

    async fn after_execution(&self) -> Result<(), SerializedError> {
        self.pipeline.after_execution().await.map_err(|e| e.into_serialized())
    }
}

/// The result of one engine invocation: the typed [`ExecutionResult`]
/// plus the wire body after middleware's `beforeResponse` hooks have
/// had a chance to mutate it. `inngest-http` serializes `body`
/// directly rather than re-deriving it from `result`.
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    /// The typed outcome, used to pick an HTTP status code.
    pub result: ExecutionResult,
    /// The exact JSON the orchestrator should receive.
    pub body: Value,
}

/// Drives one function invocation to the point where it either
/// resolves, rejects, or must suspend and report pending work (§4.3).
pub struct Engine {
    middleware: MiddlewareRegistry,
    event_sender: Option<Arc<dyn EventSender>>,
}

impl Engine {
    /// Build an engine bound to a middleware registry and the
    /// collaborator `sendEvent` executes against inline.
    pub fn new(middleware: MiddlewareRegistry, event_sender: Option<Arc<dyn EventSender>>) -> Self {
        Self {
            middleware,
            event_sender,
        }
    }

    /// Run `handler` for one invocation described by `req`.
    #[instrument(skip(self, handler, req), fields(fn_id = %req.fn_id, run_id = %req.run_id, attempt = req.attempt))]
    pub async fn run(
        &self,
        handler: &dyn FunctionHandler,
        req: RunRequest,
    ) -> Result<EngineOutcome, EngineError> {
        let meta = FunctionRunMeta {
            fn_id: req.fn_id.clone(),
            run_id: req.run_id.clone(),
            attempt: req.attempt,
            event: req.event.clone(),
            events: req.events.clone(),
        };
        let pipeline = Arc::new(self.middleware.build_function_run(&meta).await?);
        let hooks: Arc<dyn StepLifecycleHooks> = Arc::new(PipelineHooks { pipeline: Arc::clone(&pipeline) });

        let event_for_failure = req.event.clone();
        let run_id_for_failure = req.run_id.clone();

        let mut step = StepContext::new(req.memo, req.requested_run_step.clone()).with_hooks(hooks);
        if let Some(sender) = &self.event_sender {
            step = step.with_event_sender(Arc::clone(sender));
        }
        if let Some(app_id) = req.local_app_id.clone() {
            step = step.with_local_app_id(app_id);
        }
        let state = step.state();

        let mut ctx = RunContext::new(req.event, req.events, req.run_id.clone(), req.attempt, step);
        ctx.ext = pipeline.transform_input().await?;

        let outcome = handler.call(ctx).await;

        let result = match outcome {
            Ok(value) => {
                let transformed = pipeline
                    .transform_output(OutputResult {
                        data: Some(value),
                        error: None,
                    })
                    .await?;
                match transformed.error {
                    Some(err) => ExecutionResult::rejected(err, false),
                    None => ExecutionResult::FunctionResolved {
                        data: transformed.data.unwrap_or(Value::Null),
                    },
                }
            }
            Err(HandlerError::Step(inngest_step::StepError::Interrupt)) => {
                let guard = state.lock().expect("engine state poisoned");
                if let Some(op) = guard.ran() {
                    debug!(step_id = %op.id, "step ran inline");
                    ExecutionResult::StepRan { op: op.clone() }
                } else if !guard.planned().is_empty() {
                    let ops = guard.planned().to_vec();
                    debug!(count = ops.len(), "steps planned");
                    ExecutionResult::StepsPlanned { ops }
                } else if let Some(step_id) = req.requested_run_step.clone() {
                    ExecutionResult::StepNotFound { step_id }
                } else {
                    return Err(EngineError::NoOperationSubmitted);
                }
            }
            Err(HandlerError::Step(inngest_step::StepError::HashCollision(id))) => {
                return Err(EngineError::HashCollision(id));
            }
            Err(HandlerError::Step(inngest_step::StepError::Middleware(err))) => {
                return Err(EngineError::Middleware(err.into()));
            }
            Err(HandlerError::Step(step_err)) => {
                let non_retriable = matches!(
                    step_err,
                    inngest_step::StepError::InvalidTimeSpec(_)
                        | inngest_step::StepError::ConflictingMatchExpression
                        | inngest_step::StepError::InvalidInvokeTarget(_)
                );
                let serialized = step_error_to_serialized(step_err);
                let transformed = pipeline
                    .transform_output(OutputResult {
                        data: None,
                        error: Some(serialized),
                    })
                    .await?;
                ExecutionResult::rejected(
                    transformed.error.unwrap_or_else(|| SerializedError::new("unknown step error")),
                    non_retriable,
                )
            }
            Err(HandlerError::NonRetriable(err)) => {
                let transformed = pipeline
                    .transform_output(OutputResult {
                        data: None,
                        error: Some(err.inner),
                    })
                    .await?;
                ExecutionResult::rejected(
                    transformed.error.unwrap_or_else(|| SerializedError::new("unknown error")),
                    true,
                )
            }
            Err(HandlerError::Other(err)) => {
                let transformed = pipeline
                    .transform_output(OutputResult {
                        data: None,
                        error: Some(err),
                    })
                    .await?;
                ExecutionResult::rejected(
                    transformed.error.unwrap_or_else(|| SerializedError::new("unknown error")),
                    false,
                )
            }
        };

        if let ExecutionResult::FunctionRejected { non_retriable: true, ref error } = result {
            if let Some(on_failure) = &req.on_failure_handler {
                self.run_on_failure(
                    on_failure.as_ref(),
                    event_for_failure,
                    run_id_for_failure,
                    error.clone(),
                )
                .await;
            }
        }

        let body = serde_json::to_value(&result).expect("ExecutionResult always serializes");
        let payload = pipeline.before_response(ResponsePayload { body }).await?;

        Ok(EngineOutcome {
            result,
            body: payload.body,
        })
    }

    /// Invoke a function's `onFailure` handler best-effort (§3). This
    /// runs in its own, fresh step context — its ops are never folded
    /// into the failed run's result, and any error it raises is only
    /// logged, never propagated.
    async fn run_on_failure(
        &self,
        handler: &dyn FunctionHandler,
        event: Event,
        run_id: String,
        error: SerializedError,
    ) {
        let mut step = StepContext::new(Memo::empty(), None);
        if let Some(sender) = &self.event_sender {
            step = step.with_event_sender(Arc::clone(sender));
        }
        let mut ctx = RunContext::new(event, vec![], format!("{run_id}-onFailure"), 0, step);
        ctx.ext.merge(CtxPatch::empty().with("error", &error));
        if let Err(err) = handler.call(ctx).await {
            warn!(%err, "onFailure handler itself failed");
        }
    }
}

fn step_error_to_serialized(err: inngest_step::StepError) -> SerializedError {
    match err {
        inngest_step::StepError::StepFailed(e) => e,
        other => SerializedError::new(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use inngest_types::SerializedError;

    fn req(memo: Memo, requested_run_step: Option<String>) -> RunRequest {
        RunRequest {
            event: Event::new("demo/hello.world", serde_json::json!({})),
            events: vec![],
            run_id: "run-1".into(),
            attempt: 0,
            fn_id: "hello-world".into(),
            memo,
            requested_run_step,
            local_app_id: None,
            on_failure_handler: None,
        }
    }

    #[tokio::test]
    async fn hello_world_resolves_directly_with_no_steps() {
        let engine = Engine::new(MiddlewareRegistry::empty(), None);
        let handler = handler_fn(|_ctx| {
            Box::pin(async move { Ok(serde_json::json!("Hello, Inngest!")) })
        });
        let outcome = engine.run(&handler, req(Memo::empty(), None)).await.unwrap();
        assert_eq!(
            outcome.result,
            ExecutionResult::FunctionResolved {
                data: serde_json::json!("Hello, Inngest!")
            }
        );
    }

    #[tokio::test]
    async fn first_invocation_plans_a_run_step() {
        let engine = Engine::new(MiddlewareRegistry::empty(), None);
        let handler = handler_fn(|ctx| {
            Box::pin(async move {
                let greeting: String = ctx
                    .step
                    .run("build-greeting", || async { Ok::<_, SerializedError>("hi".to_string()) })
                    .await?;
                Ok(serde_json::json!(greeting))
            })
        });
        let outcome = engine.run(&handler, req(Memo::empty(), None)).await.unwrap();
        match outcome.result {
            ExecutionResult::StepsPlanned { ops } => assert_eq!(ops.len(), 1),
            other => panic!("expected StepsPlanned, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn requested_step_executes_inline_and_reports_step_ran() {
        let engine = Engine::new(MiddlewareRegistry::empty(), None);
        let op = inngest_types::Op::new(0, inngest_types::OpCode::StepPlanned, "build-greeting", None);
        let handler = handler_fn(|ctx| {
            Box::pin(async move {
                let greeting: String = ctx
                    .step
                    .run("build-greeting", || async { Ok::<_, SerializedError>("hi".to_string()) })
                    .await?;
                Ok(serde_json::json!(greeting))
            })
        });
        let outcome = engine
            .run(&handler, req(Memo::empty(), Some(op.id.clone())))
            .await
            .unwrap();
        match outcome.result {
            ExecutionResult::StepRan { op: ran } => {
                assert_eq!(ran.id, op.id);
                assert_eq!(ran.data, Some(serde_json::json!("hi")));
            }
            other => panic!("expected StepRan, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn memoized_step_lets_handler_resolve() {
        let op = inngest_types::Op::new(0, inngest_types::OpCode::StepPlanned, "build-greeting", None);
        let mut entries = std::collections::HashMap::new();
        entries.insert(
            op.id.clone(),
            inngest_types::MemoizedOp {
                id: op.id,
                data: Some(serde_json::json!("hi")),
                error: None,
            },
        );
        let engine = Engine::new(MiddlewareRegistry::empty(), None);
        let handler = handler_fn(|ctx| {
            Box::pin(async move {
                let greeting: String = ctx
                    .step
                    .run("build-greeting", || async { Ok::<_, SerializedError>("unused".to_string()) })
                    .await?;
                Ok(serde_json::json!(greeting))
            })
        });
        let outcome = engine
            .run(&handler, req(Memo::new(entries), None))
            .await
            .unwrap();
        assert_eq!(
            outcome.result,
            ExecutionResult::FunctionResolved {
                data: serde_json::json!("hi")
            }
        );
    }

    #[tokio::test]
    async fn uncaught_step_error_rejects_the_function() {
        let engine = Engine::new(MiddlewareRegistry::empty(), None);
        let op = inngest_types::Op::new(0, inngest_types::OpCode::StepPlanned, "a", None);
        let mut entries = std::collections::HashMap::new();
        entries.insert(
            op.id.clone(),
            inngest_types::MemoizedOp {
                id: op.id,
                data: None,
                error: Some(SerializedError::new("Oh no!")),
            },
        );
        let handler = handler_fn(|ctx| {
            Box::pin(async move {
                let _: String = ctx
                    .step
                    .run("a", || async { Ok::<_, SerializedError>("unused".to_string()) })
                    .await?;
                Ok(serde_json::json!("unreachable"))
            })
        });
        let outcome = engine.run(&handler, req(Memo::new(entries), None)).await.unwrap();
        match outcome.result {
            ExecutionResult::FunctionRejected { error, non_retriable } => {
                assert_eq!(error.message, "Oh no!");
                assert!(!non_retriable);
            }
            other => panic!("expected FunctionRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn caught_step_error_lets_handler_recover_and_plan_next_step() {
        let engine = Engine::new(MiddlewareRegistry::empty(), None);
        let op_a = inngest_types::Op::new(0, inngest_types::OpCode::StepPlanned, "a", None);
        let mut entries = std::collections::HashMap::new();
        entries.insert(
            op_a.id.clone(),
            inngest_types::MemoizedOp {
                id: op_a.id,
                data: None,
                error: Some(SerializedError::new("Oh no!")),
            },
        );
        let handler = handler_fn(|ctx| {
            Box::pin(async move {
                let result: Result<String, _> = ctx
                    .step
                    .run("a", || async { Ok::<_, SerializedError>("unused".to_string()) })
                    .await;
                if result.is_err() {
                    let _: String = ctx
                        .step
                        .run("b", || async { Ok::<_, SerializedError>("recovered".to_string()) })
                        .await?;
                }
                Ok(serde_json::json!("done"))
            })
        });
        let outcome = engine.run(&handler, req(Memo::new(entries), None)).await.unwrap();
        match outcome.result {
            ExecutionResult::StepsPlanned { ops } => {
                assert_eq!(ops.len(), 1);
                assert_eq!(ops[0].display_name.as_deref(), Some("b"));
            }
            other => panic!("expected StepsPlanned for step b, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn terminal_rejection_invokes_on_failure_handler() {
        let engine = Engine::new(MiddlewareRegistry::empty(), None);
        let handler = handler_fn(|_ctx| {
            Box::pin(async move {
                Err(HandlerError::NonRetriable(
                    SerializedError::new("boom").into_non_retriable(),
                ))
            })
        });
        let invoked = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let invoked_clone = Arc::clone(&invoked);
        let on_failure = handler_fn(move |_ctx| {
            let invoked = Arc::clone(&invoked_clone);
            Box::pin(async move {
                invoked.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(serde_json::json!(null))
            })
        });
        let mut request = req(Memo::empty(), None);
        request.on_failure_handler = Some(Arc::new(on_failure));
        let outcome = engine.run(&handler, request).await.unwrap();
        assert!(matches!(
            outcome.result,
            ExecutionResult::FunctionRejected { non_retriable: true, .. }
        ));
        assert!(invoked.load(std::sync::atomic::Ordering::SeqCst));
    }

    struct RecordingHooks {
        log: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl inngest_middleware::FunctionRunHooks for RecordingHooks {
        async fn before_memoization(&self) -> Result<(), inngest_middleware::MiddlewareError> {
            self.log.lock().unwrap().push("before_memoization");
            Ok(())
        }
        async fn after_memoization(&self) -> Result<(), inngest_middleware::MiddlewareError> {
            self.log.lock().unwrap().push("after_memoization");
            Ok(())
        }
        async fn before_execution(&self) -> Result<(), inngest_middleware::MiddlewareError> {
            self.log.lock().unwrap().push("before_execution");
            Ok(())
        }
        async fn after_execution(&self) -> Result<(), inngest_middleware::MiddlewareError> {
            self.log.lock().unwrap().push("after_execution");
            Ok(())
        }
    }

    struct RecordingMiddleware {
        log: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl inngest_middleware::Middleware for RecordingMiddleware {
        fn name(&self) -> &str {
            "recording"
        }

        async fn on_function_run(
            &self,
            _meta: &FunctionRunMeta,
        ) -> Result<Box<dyn inngest_middleware::FunctionRunHooks>, inngest_middleware::MiddlewareError> {
            Ok(Box::new(RecordingHooks { log: Arc::clone(&self.log) }))
        }
    }

    #[tokio::test]
    async fn hooks_bracket_the_requested_steps_memo_and_execution_transitions() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let registry = MiddlewareRegistry::new(vec![Arc::new(RecordingMiddleware { log: Arc::clone(&log) })]);
        let engine = Engine::new(registry, None);
        let op = inngest_types::Op::new(0, inngest_types::OpCode::StepPlanned, "build-greeting", None);
        let handler = handler_fn(|ctx| {
            Box::pin(async move {
                let greeting: String = ctx
                    .step
                    .run("build-greeting", || async { Ok::<_, SerializedError>("hi".to_string()) })
                    .await?;
                Ok(serde_json::json!(greeting))
            })
        });
        engine
            .run(&handler, req(Memo::empty(), Some(op.id.clone())))
            .await
            .unwrap();
        let recorded = log.lock().unwrap().clone();
        assert_eq!(
            recorded,
            vec!["before_memoization", "after_memoization", "before_execution", "after_execution"]
        );
    }
}
