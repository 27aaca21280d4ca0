//! `StepContext` — the toolkit user function handlers call into.

use crate::error::StepError;
use crate::hooks::StepLifecycleHooks;
use crate::memo::Memo;
use crate::sender::EventSender;
use crate::state::EngineState;
use crate::types::{
    AiInferInput, InvokeInput, InvokeTarget, SendEventOutput, TimeoutSpec, WaitForEventInput,
};
use inngest_types::{AppId, DurationSpec, Event, Op, OpCode, OpOpts, SerializedError, TimeSpec};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// The durable step toolkit, handed to a function handler on every
/// invocation.
///
/// Each method takes a stable, caller-supplied `id` (combined with
/// call position and options to form the op's hashed identity, §4.1)
/// and either replays a memoized result, executes inline when asked
/// to, or plans a new op and suspends via [`StepError::Interrupt`].
///
/// Cloning a `StepContext` is cheap and shares the same underlying
/// position counter and discovered-ops list — this is what lets
/// `futures::join!`-style concurrent step calls register into the
/// same invocation.
#[derive(Clone)]
pub struct StepContext {
    memo: Arc<Memo>,
    requested_run_step: Option<String>,
    state: Arc<Mutex<EngineState>>,
    event_sender: Option<Arc<dyn EventSender>>,
    hooks: Option<Arc<dyn StepLifecycleHooks>>,
    local_app_id: Option<AppId>,
}

impl StepContext {
    /// Build a context for one function invocation.
    pub fn new(memo: Memo, requested_run_step: Option<String>) -> Self {
        Self {
            memo: Arc::new(memo),
            requested_run_step,
            state: Arc::new(Mutex::new(EngineState::new())),
            event_sender: None,
            hooks: None,
            local_app_id: None,
        }
    }

    /// Attach the collaborator `sendEvent` uses when it executes
    /// inline.
    #[must_use]
    pub fn with_event_sender(mut self, sender: Arc<dyn EventSender>) -> Self {
        self.event_sender = Some(sender);
        self
    }

    /// Attach the middleware lifecycle hooks that bracket this
    /// invocation's memo-lookup/discovery/execution transitions (§4.3).
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn StepLifecycleHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Attach the local app id `invoke` resolves `Local`/unscoped
    /// `Reference` targets against.
    #[must_use]
    pub fn with_local_app_id(mut self, app_id: AppId) -> Self {
        self.local_app_id = Some(app_id);
        self
    }

    /// The shared engine state, for the engine driving this invocation
    /// to inspect after the handler returns or suspends.
    pub fn state(&self) -> Arc<Mutex<EngineState>> {
        Arc::clone(&self.state)
    }

    fn next_pos(&self) -> u32 {
        self.state.lock().expect("engine state poisoned").next_pos()
    }

    /// Fire `before_memoization` the first time any step in this
    /// invocation consults the memo.
    async fn notify_memo_lookup(&self) -> Result<(), StepError> {
        let should_fire = self.state.lock().expect("engine state poisoned").begin_memo_lookup();
        if should_fire {
            if let Some(hooks) = &self.hooks {
                hooks.before_memoization().await.map_err(StepError::Middleware)?;
            }
        }
        Ok(())
    }

    /// Fire `after_memoization` the first time a step call finds no
    /// memo entry (i.e. this invocation starts discovering new work).
    async fn notify_discovery(&self) -> Result<(), StepError> {
        let should_fire = self.state.lock().expect("engine state poisoned").begin_discovery();
        if should_fire {
            if let Some(hooks) = &self.hooks {
                hooks.after_memoization().await.map_err(StepError::Middleware)?;
            }
        }
        Ok(())
    }

    async fn notify_before_execution(&self) -> Result<(), StepError> {
        if let Some(hooks) = &self.hooks {
            hooks.before_execution().await.map_err(StepError::Middleware)?;
        }
        Ok(())
    }

    async fn notify_after_execution(&self) -> Result<(), StepError> {
        if let Some(hooks) = &self.hooks {
            hooks.after_execution().await.map_err(StepError::Middleware)?;
        }
        Ok(())
    }

    /// Look up a step's recorded result, replaying it if present, or
    /// plan it and suspend otherwise. Shared by every non-executable
    /// toolkit method (`sleep`, `sleepUntil`, `waitForEvent`, `invoke`,
    /// `ai.infer`) — none of these run anything locally, they only
    /// describe a request for the orchestrator to fulfill, so only the
    /// memoization hooks apply; `before_execution`/`after_execution`
    /// bracket actual inline execution in [`Self::memoized_exec`].
    async fn plan_or_replay<T: DeserializeOwned>(&self, op: Op) -> Result<T, StepError> {
        self.notify_memo_lookup().await?;
        if let Some(memo) = self.memo.get(&op.id) {
            if let Some(err) = &memo.error {
                return Err(StepError::StepFailed(err.clone()));
            }
            let value = memo.data.clone().unwrap_or(Value::Null);
            return serde_json::from_value(value).map_err(|e| {
                StepError::StepFailed(SerializedError::new(format!(
                    "failed to decode memoized step result: {e}"
                )))
            });
        }
        self.notify_discovery().await?;
        self.state
            .lock()
            .expect("engine state poisoned")
            .record_planned(op)
            .map_err(StepError::HashCollision)?;
        Err(StepError::Interrupt)
    }

    /// Shared by the two toolkit methods that may run user code inline
    /// when the orchestrator specifically asks for that step
    /// (`run`/`ai.wrap`).
    async fn memoized_exec<T, E, F, Fut>(
        &self,
        display_name: &str,
        opcode: OpCode,
        f: F,
    ) -> Result<T, StepError>
    where
        T: Serialize + DeserializeOwned,
        E: Into<SerializedError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let pos = self.next_pos();
        let op = Op::new(pos, opcode, display_name, None);

        self.notify_memo_lookup().await?;
        if let Some(memo) = self.memo.get(&op.id) {
            if let Some(err) = &memo.error {
                return Err(StepError::StepFailed(err.clone()));
            }
            let value = memo.data.clone().unwrap_or(Value::Null);
            return serde_json::from_value(value).map_err(|e| {
                StepError::StepFailed(SerializedError::new(format!(
                    "failed to decode memoized step result: {e}"
                )))
            });
        }
        self.notify_discovery().await?;

        if self.requested_run_step.as_deref() == Some(op.id.as_str()) {
            self.notify_before_execution().await?;
            let outcome = f().await;
            self.notify_after_execution().await?;
            match outcome {
                Ok(value) => {
                    let data = serde_json::to_value(&value).map_err(|e| {
                        StepError::StepFailed(SerializedError::new(format!(
                            "failed to encode step result: {e}"
                        )))
                    })?;
                    let ran = op.with_data(data);
                    self.state
                        .lock()
                        .expect("engine state poisoned")
                        .record_ran(ran)
                        .map_err(StepError::HashCollision)?;
                    Ok(value)
                }
                Err(e) => {
                    let serialized = e.into();
                    let ran = op.with_error(serialized.clone());
                    self.state
                        .lock()
                        .expect("engine state poisoned")
                        .record_ran(ran)
                        .map_err(StepError::HashCollision)?;
                    Err(StepError::StepFailed(serialized))
                }
            }
        } else {
            self.state
                .lock()
                .expect("engine state poisoned")
                .record_planned(op)
                .map_err(StepError::HashCollision)?;
            Err(StepError::Interrupt)
        }
    }

    /// Memoized unit of work (§4.2). On first encounter, runs `f` —
    /// but only if the orchestrator requested this exact step inline;
    /// otherwise plans a `StepPlanned` op and suspends. On replay,
    /// returns the memoized value or re-raises the memoized error.
    pub async fn run<T, E, F, Fut>(&self, id: &str, f: F) -> Result<T, StepError>
    where
        T: Serialize + DeserializeOwned,
        E: Into<SerializedError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.memoized_exec(id, OpCode::StepPlanned, f).await
    }

    /// `ai.wrap` — semantically identical to [`Self::run`] (§4.2 groups
    /// them), kept as a distinct method so call sites read the way
    /// they describe their intent.
    pub async fn ai_wrap<T, E, F, Fut>(&self, id: &str, f: F) -> Result<T, StepError>
    where
        T: Serialize + DeserializeOwned,
        E: Into<SerializedError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.memoized_exec(id, OpCode::StepPlanned, f).await
    }

    /// Park the run for `duration`, then return.
    pub async fn sleep(&self, id: &str, duration: impl TryInto<DurationSpec, Error = inngest_types::TimeSpecError>) -> Result<(), StepError> {
        let duration = duration.try_into()?;
        let pos = self.next_pos();
        let opts = OpOpts::Sleep {
            timeout: duration.to_wire_string(),
        };
        let op = Op::new(pos, OpCode::Sleep, id, Some(opts));
        self.plan_or_replay(op).await
    }

    /// Park the run until `time`, then return.
    pub async fn sleep_until(&self, id: &str, time: impl TryInto<TimeSpec, Error = inngest_types::TimeSpecError>) -> Result<(), StepError> {
        let time = time.try_into()?;
        let pos = self.next_pos();
        let opts = OpOpts::Sleep {
            timeout: time.to_wire_string(),
        };
        let op = Op::new(pos, OpCode::Sleep, id, Some(opts));
        self.plan_or_replay(op).await
    }

    /// Wait for a matching event, or `None` on timeout.
    pub async fn wait_for_event(&self, id: &str, input: WaitForEventInput) -> Result<Option<Event>, StepError> {
        let pos = self.next_pos();
        let opts = OpOpts::WaitForEvent {
            event: input.event,
            timeout: input.timeout.to_wire_string(),
            if_expr: input.condition.as_ref().map(|c| c.compile()),
        };
        let op = Op::new(pos, OpCode::WaitForEvent, id, Some(opts));
        self.plan_or_replay(op).await
    }

    /// Send one or more events. Executes inline (via the configured
    /// [`EventSender`]) when the orchestrator requests this step;
    /// otherwise plans and suspends like [`Self::run`].
    pub async fn send_event(&self, id: &str, events: Vec<Event>) -> Result<SendEventOutput, StepError> {
        let sender = self.event_sender.clone();
        let events_for_exec = events.clone();
        self.memoized_exec(id, OpCode::StepPlanned, move || async move {
            let sender = sender.ok_or_else(|| {
                SerializedError::new("sendEvent: no EventSender configured on this StepContext")
            })?;
            let ids = sender.send(&events_for_exec).await?;
            Ok::<_, SerializedError>(SendEventOutput { ids, extra: Value::Null })
        })
        .await
    }

    /// Resolve an [`InvokeTarget`] to the wire `function_id` string
    /// (§4.2): a local definition or unscoped reference is resolved
    /// against this context's configured app id; a qualified string or
    /// a reference that already names its app passes through as-is.
    fn resolve_invoke_target(&self, target: &InvokeTarget) -> Result<String, StepError> {
        match target {
            InvokeTarget::Qualified(s) => Ok(s.clone()),
            InvokeTarget::Local(def) => {
                let app_id = self.local_app_id.as_ref().ok_or_else(|| {
                    StepError::InvalidInvokeTarget(
                        "invoke: local function target requires a local app id".to_string(),
                    )
                })?;
                Ok(format!("{app_id}-{}", def.id))
            }
            InvokeTarget::Reference { function_id, app_id } => {
                let app_id = app_id.as_ref().or(self.local_app_id.as_ref()).ok_or_else(|| {
                    StepError::InvalidInvokeTarget(
                        "invoke: unscoped reference target requires a local app id".to_string(),
                    )
                })?;
                Ok(format!("{app_id}-{function_id}"))
            }
        }
    }

    /// Invoke another function and wait for its result.
    pub async fn invoke(&self, id: &str, input: InvokeInput) -> Result<Value, StepError> {
        input.validate().map_err(StepError::InvalidInvokeTarget)?;
        let function_id = self.resolve_invoke_target(&input.target)?;
        let pos = self.next_pos();
        let opts = OpOpts::InvokeFunction {
            function_id,
            payload: input.data,
            timeout: input.timeout.map(|t| t.to_wire_string()),
        };
        let op = Op::new(pos, OpCode::InvokeFunction, id, Some(opts));
        self.plan_or_replay(op).await
    }

    /// Proxy an AI inference request through the orchestrator's AI
    /// gateway.
    pub async fn ai_infer(&self, id: &str, input: AiInferInput) -> Result<Value, StepError> {
        let body = input.resolved_body();
        let pos = self.next_pos();
        let opts = OpOpts::AiGateway {
            format: input.format,
            provider: input.provider,
            url: input.url,
            auth_key: input.auth_key,
            body,
            headers: Default::default(),
        };
        let op = Op::new(pos, OpCode::AiGateway, id, Some(opts));
        self.plan_or_replay(op).await
    }
}
