//! Ergonomic function-definition builder (§3 "Function definition").
//!
//! Mirrors the source SDK's `createFunction(id, trigger, handler)`
//! call shape: pair a [`FunctionDefinition`] with the
//! [`FunctionHandler`] that runs it, ready to hand to
//! [`crate::app::InngestApp::register_function`].

use inngest_engine::{handler_fn, FunctionHandler, HandlerError, RunContext};
use inngest_types::{FunctionConfig, FunctionDefinition, FunctionId, Trigger};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, HandlerError>> + Send>>;

/// Declare a function triggered by a single [`Trigger`], with no extra
/// concurrency/retry/batch configuration. For more control, build a
/// [`FunctionDefinition`] directly and pair it with
/// [`wrap_handler`].
///
/// ```ignore
/// let (def, handler) = create_function("hello-world", Trigger::event("demo/hello.world"), |ctx| {
///     Box::pin(async move { Ok(serde_json::json!("Hello, Inngest!")) })
/// });
/// app = app.register_function(def, handler)?;
/// ```
pub fn create_function<F>(
    id: impl Into<FunctionId>,
    trigger: Trigger,
    handler: F,
) -> (FunctionDefinition, Arc<dyn FunctionHandler>)
where
    F: Fn(RunContext) -> HandlerFuture + Send + Sync + 'static,
{
    (FunctionDefinition::new(id, trigger), wrap_handler(handler))
}

/// Declare a function with full control over its [`FunctionConfig`]
/// (concurrency, retries, rate limits, batching) and multiple triggers.
pub fn create_function_with_config<F>(
    id: impl Into<FunctionId>,
    triggers: Vec<Trigger>,
    config: FunctionConfig,
    handler: F,
) -> (FunctionDefinition, Arc<dyn FunctionHandler>)
where
    F: Fn(RunContext) -> HandlerFuture + Send + Sync + 'static,
{
    let def = FunctionDefinition {
        id: id.into(),
        name: None,
        triggers,
        config,
    };
    (def, wrap_handler(handler))
}

/// Wrap a closure as a [`FunctionHandler`] trait object, for callers
/// assembling a [`FunctionDefinition`] by hand.
pub fn wrap_handler<F>(handler: F) -> Arc<dyn FunctionHandler>
where
    F: Fn(RunContext) -> HandlerFuture + Send + Sync + 'static,
{
    Arc::new(handler_fn(handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_function_pairs_definition_with_handler() {
        let (def, _handler) = create_function("hello-world", Trigger::event("demo/hello.world"), |_ctx| {
            Box::pin(async move { Ok(serde_json::json!("Hello, Inngest!")) })
        });
        assert_eq!(def.id.as_str(), "hello-world");
        assert_eq!(def.triggers.len(), 1);
    }
}
