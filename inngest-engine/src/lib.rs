//! The replay-driven execution engine (§4.3) and the
//! [`handler::FunctionHandler`] trait user function bodies implement.
//!
//! This crate is the one place that is allowed to match on
//! [`inngest_step::StepError::Interrupt`] directly — everything
//! upstream of it (`inngest-step`) only ever propagates the sentinel
//! with `?`, and everything downstream (`inngest-http`) only ever sees
//! the already-resolved [`inngest_types::ExecutionResult`].

pub mod driver;
pub mod error;
pub mod event_sender;
pub mod handler;
pub mod run_context;

pub use driver::{Engine, EngineOutcome, RunRequest};
pub use error::{EngineError, HandlerError};
pub use event_sender::MiddlewareEventSender;
pub use handler::{handler_fn, FunctionHandler};
pub use run_context::RunContext;
