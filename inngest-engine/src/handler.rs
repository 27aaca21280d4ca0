//! The user function handler trait (§3 "Function definition" `handler:
//! UserFn`).

use crate::error::HandlerError;
use crate::run_context::RunContext;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// A function's durable handler body.
///
/// Implemented directly for async closures via [`handler_fn`] — most
/// callers never implement this trait by hand, mirroring how
/// `neuron_tool::tool_middleware_fn` wraps a closure into a
/// dyn-compatible middleware rather than asking users to write an impl
/// block.
#[async_trait]
pub trait FunctionHandler: Send + Sync {
    /// Run the handler body for one invocation. Returns the JSON-
    /// reduced return value on success; propagates [`HandlerError`] on
    /// suspension or failure.
    async fn call(&self, ctx: RunContext) -> Result<Value, HandlerError>;
}

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, HandlerError>> + Send>>;

struct ClosureHandler<F> {
    f: F,
}

#[async_trait]
impl<F> FunctionHandler for ClosureHandler<F>
where
    F: Fn(RunContext) -> HandlerFuture + Send + Sync,
{
    async fn call(&self, ctx: RunContext) -> Result<Value, HandlerError> {
        (self.f)(ctx).await
    }
}

/// Build a [`FunctionHandler`] from a closure returning a boxed future,
/// the same way `neuron_tool::tool_middleware_fn` turns a closure into
/// dyn-compatible middleware:
///
/// ```ignore
/// let handler = handler_fn(|ctx| Box::pin(async move {
///     let greeting = ctx.step.run("build-greeting", || async {
///         Ok::<_, SerializedError>("Hello, Inngest!".to_string())
///     }).await?;
///     Ok(serde_json::json!(greeting))
/// }));
/// ```
pub fn handler_fn<F>(f: F) -> impl FunctionHandler
where
    F: Fn(RunContext) -> HandlerFuture + Send + Sync,
{
    ClosureHandler { f }
}
