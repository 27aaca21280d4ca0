//! The middleware pipeline (§4.4): ordered lifecycle hooks around
//! function runs and outbound event sends, with typed accumulation of
//! context mutations across layers.
//!
//! This crate is deliberately the lowest layer that knows about
//! middleware — it has no dependency on `inngest-step` or
//! `inngest-engine`, so hooks operate on the neutral shapes in
//! [`hooks`]/[`context`]. `inngest-engine` owns wiring a
//! [`registry::MiddlewareRegistry`] into an actual run.

pub mod context;
pub mod error;
pub mod hooks;
pub mod registry;

pub use context::{CtxPatch, RunContextExt};
pub use error::MiddlewareError;
pub use hooks::{
    FunctionRunHooks, FunctionRunMeta, Middleware, NoopFunctionRunHooks, NoopSendEventHooks,
    OutputResult, ResponsePayload, SendEventHooks,
};
pub use registry::{FunctionRunPipeline, MiddlewareRegistry, SendEventPipeline};
