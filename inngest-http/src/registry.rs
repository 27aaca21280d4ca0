//! The function registry: a map from function id to its definition and
//! handler, built once at `InngestClient` construction and read-only
//! thereafter (§5 "Shared resource policy").

use inngest_engine::FunctionHandler;
use inngest_middleware::Middleware;
use inngest_types::{ConfigError, FunctionDefinition, FunctionId};
use std::collections::HashMap;
use std::sync::Arc;

/// One registered function: its declarative definition, the handler
/// body that runs it, function-scoped middleware (§3, run in addition
/// to whatever middleware the app registered), and the handler behind
/// its `onFailure` metadata, if declared.
#[derive(Clone)]
pub struct RegisteredFunction {
    /// The function's metadata (triggers, concurrency, retries, …).
    pub definition: FunctionDefinition,
    /// The durable handler body.
    pub handler: Arc<dyn FunctionHandler>,
    /// Middleware registered against this function specifically, run
    /// after app-scoped middleware (§4.4 "function-scoped middleware
    /// runs innermost").
    pub middleware: Vec<Arc<dyn Middleware>>,
    /// The handler behind `definition.on_failure`, if one was paired at
    /// registration time.
    pub on_failure_handler: Option<Arc<dyn FunctionHandler>>,
}

impl RegisteredFunction {
    /// Build the middleware list this function's run should use:
    /// app-scoped middleware first, then this function's own, so
    /// function-scoped hooks nest innermost (§4.4).
    pub fn effective_middleware(&self, app_middleware: &[Arc<dyn Middleware>]) -> Vec<Arc<dyn Middleware>> {
        app_middleware
            .iter()
            .cloned()
            .chain(self.middleware.iter().cloned())
            .collect()
    }
}

/// An immutable, app-scoped catalog of registered functions.
///
/// Duplicate function ids are a hard configuration error (§3, §5),
/// surfaced as `Err` from [`FunctionRegistryBuilder::build`] rather
/// than a panic at startup, matching this workspace's
/// `thiserror`-first convention.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: Arc<HashMap<FunctionId, RegisteredFunction>>,
}

impl FunctionRegistry {
    /// Look up a registered function by id.
    pub fn get(&self, id: &FunctionId) -> Option<&RegisteredFunction> {
        self.functions.get(id)
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether no functions are registered.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Iterate over every registered function's definition, for
    /// building the registration payload (§6).
    pub fn definitions(&self) -> impl Iterator<Item = &FunctionDefinition> {
        self.functions.values().map(|f| &f.definition)
    }
}

/// Accumulates function registrations before they are frozen into a
/// [`FunctionRegistry`].
#[derive(Default)]
pub struct FunctionRegistryBuilder {
    functions: HashMap<FunctionId, RegisteredFunction>,
    order: Vec<FunctionId>,
}

impl FunctionRegistryBuilder {
    /// Start an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one function with no function-scoped middleware and no
    /// paired `onFailure` handler.
    pub fn register(
        &mut self,
        definition: FunctionDefinition,
        handler: Arc<dyn FunctionHandler>,
    ) -> Result<(), ConfigError> {
        self.register_with(definition, handler, vec![], None)
    }

    /// Register one function, pairing its `onFailure` metadata (if any)
    /// with the handler that actually runs it and attaching
    /// function-scoped middleware. Returns `Err` immediately on a
    /// duplicate id rather than deferring the check to [`Self::build`],
    /// so app code sees the failure at the call site that introduced
    /// it.
    pub fn register_with(
        &mut self,
        definition: FunctionDefinition,
        handler: Arc<dyn FunctionHandler>,
        middleware: Vec<Arc<dyn Middleware>>,
        on_failure_handler: Option<Arc<dyn FunctionHandler>>,
    ) -> Result<(), ConfigError> {
        if definition.id.as_str().is_empty() {
            return Err(ConfigError::EmptyFunctionId);
        }
        if definition.triggers.is_empty() {
            return Err(ConfigError::NoTriggers(definition.id.to_string()));
        }
        if self.functions.contains_key(&definition.id) {
            return Err(ConfigError::DuplicateFunctionId(
                definition.id.to_string(),
                "<app>".to_string(),
            ));
        }
        self.order.push(definition.id.clone());
        self.functions.insert(
            definition.id.clone(),
            RegisteredFunction {
                definition,
                handler,
                middleware,
                on_failure_handler,
            },
        );
        Ok(())
    }

    /// Freeze the builder into an immutable, shareable registry.
    pub fn build(self) -> FunctionRegistry {
        FunctionRegistry {
            functions: Arc::new(self.functions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use inngest_engine::{HandlerError, RunContext};
    use inngest_types::Trigger;

    struct NoopHandler;

    #[async_trait]
    impl FunctionHandler for NoopHandler {
        async fn call(&self, _ctx: RunContext) -> Result<serde_json::Value, HandlerError> {
            Ok(serde_json::Value::Null)
        }
    }

    #[test]
    fn registers_distinct_functions() {
        let mut builder = FunctionRegistryBuilder::new();
        builder
            .register(
                FunctionDefinition::new("a", Trigger::event("demo/a")),
                Arc::new(NoopHandler),
            )
            .unwrap();
        builder
            .register(
                FunctionDefinition::new("b", Trigger::event("demo/b")),
                Arc::new(NoopHandler),
            )
            .unwrap();
        let registry = builder.build();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn rejects_duplicate_id() {
        let mut builder = FunctionRegistryBuilder::new();
        builder
            .register(
                FunctionDefinition::new("a", Trigger::event("demo/a")),
                Arc::new(NoopHandler),
            )
            .unwrap();
        let err = builder
            .register(
                FunctionDefinition::new("a", Trigger::event("demo/a-again")),
                Arc::new(NoopHandler),
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateFunctionId(..)));
    }

    #[test]
    fn rejects_function_with_no_triggers() {
        let mut builder = FunctionRegistryBuilder::new();
        let def = FunctionDefinition {
            id: "a".into(),
            name: None,
            triggers: vec![],
            config: Default::default(),
            on_failure: None,
        };
        let err = builder.register(def, Arc::new(NoopHandler)).unwrap_err();
        assert!(matches!(err, ConfigError::NoTriggers(_)));
    }

    #[test]
    fn lookup_by_id_finds_registered_function() {
        let mut builder = FunctionRegistryBuilder::new();
        builder
            .register(
                FunctionDefinition::new("a", Trigger::event("demo/a")),
                Arc::new(NoopHandler),
            )
            .unwrap();
        let registry = builder.build();
        assert!(registry.get(&"a".into()).is_some());
        assert!(registry.get(&"missing".into()).is_none());
    }

    struct StubMiddleware(&'static str);

    #[async_trait]
    impl Middleware for StubMiddleware {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn effective_middleware_runs_app_scope_before_function_scope() {
        let mut builder = FunctionRegistryBuilder::new();
        builder
            .register_with(
                FunctionDefinition::new("a", Trigger::event("demo/a")),
                Arc::new(NoopHandler),
                vec![Arc::new(StubMiddleware("fn-scoped"))],
                None,
            )
            .unwrap();
        let registry = builder.build();
        let registered = registry.get(&"a".into()).unwrap();
        let app_middleware: Vec<Arc<dyn Middleware>> = vec![Arc::new(StubMiddleware("app-scoped"))];
        let effective = registered.effective_middleware(&app_middleware);
        let names: Vec<&str> = effective.iter().map(|m| m.name()).collect();
        assert_eq!(names, vec!["app-scoped", "fn-scoped"]);
    }

    #[test]
    fn on_failure_handler_travels_with_registration() {
        let mut builder = FunctionRegistryBuilder::new();
        let on_failure_def = FunctionDefinition::new("a-failed", Trigger::event("demo/a"));
        builder
            .register_with(
                FunctionDefinition::new("a", Trigger::event("demo/a")).with_on_failure(on_failure_def),
                Arc::new(NoopHandler),
                vec![],
                Some(Arc::new(NoopHandler)),
            )
            .unwrap();
        let registry = builder.build();
        let registered = registry.get(&"a".into()).unwrap();
        assert!(registered.definition.on_failure.is_some());
        assert!(registered.on_failure_handler.is_some());
    }
}
