//! The durable step toolkit: `run`, `sleep`, `sleepUntil`,
//! `waitForEvent`, `sendEvent`, `invoke`, `ai.infer`, and `ai.wrap`.
//!
//! Every method hashes its call site (position, op kind, caller id,
//! options) into a stable step identity and either replays a memoized
//! result, executes inline when the orchestrator asks for that exact
//! step, or plans a new op and suspends by returning
//! [`error::StepError::Interrupt`]. The execution engine crate owns
//! driving a handler through repeated invocations of this suspension
//! cycle; this crate only owns the toolkit surface itself.

pub mod context;
pub mod error;
pub mod hooks;
pub mod memo;
pub mod sender;
pub mod state;
pub mod types;

pub use context::StepContext;
pub use error::StepError;
pub use hooks::StepLifecycleHooks;
pub use memo::Memo;
pub use sender::EventSender;
pub use state::EngineState;
pub use types::{
    AiInferInput, InvokeInput, InvokeTarget, MatchCondition, RunInput, SendEventOutput,
    TimeoutSpec, WaitForEventInput,
};
