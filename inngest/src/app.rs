//! `InngestApp` — the builder app authors assemble at startup, and
//! [`Inngest`], the frozen handle it produces.
//!
//! Grounded on `neuron_orch_kit::Kit`'s "unopinionated wiring handle"
//! shape: a small builder that holds protocol implementations
//! (registry, middleware, transports) and exposes helpers for the
//! common local wiring, while still letting callers bypass it and
//! construct `inngest_http::InngestHandler` directly.

use crate::dev;
use crate::events::EventClient;
use crate::registration::ReqwestRegistrationTransport;
use inngest_engine::FunctionHandler;
use inngest_http::{
    build_router, FunctionRegistryBuilder, HttpError, InngestConfig, InngestHandler, Mode,
};
use inngest_middleware::{Middleware, MiddlewareError, MiddlewareRegistry};
use inngest_step::EventSender;
use inngest_types::{ConfigError, Event, FunctionDefinition};
use std::sync::Arc;
use tracing::info;

/// The framework adapter name this crate reports in registration and
/// introspection payloads (§4.5, §6). This workspace ships exactly one
/// adapter (§1) — axum.
pub const FRAMEWORK: &str = "axum";

/// Accumulates an app's configuration, function catalog, and
/// middleware before freezing them into an [`Inngest`] client.
///
/// Unlike [`FunctionRegistryBuilder`] (which only tracks functions),
/// `InngestApp` is the full composition root: one instance per
/// process, built once at startup and never mutated again (§5 "Shared
/// resource policy").
pub struct InngestApp {
    app_name: String,
    config: InngestConfig,
    registry: FunctionRegistryBuilder,
    middleware: Vec<Arc<dyn Middleware>>,
    event_sender_override: Option<Arc<dyn EventSender>>,
}

impl InngestApp {
    /// Start building an app named `app_name`. Configuration defaults
    /// to [`InngestConfig::from_env`] — call [`Self::with_config`] to
    /// override explicit fields before environment resolution.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            config: InngestConfig::from_env(),
            registry: FunctionRegistryBuilder::new(),
            middleware: Vec::new(),
            event_sender_override: None,
        }
    }

    /// Replace the resolved configuration outright. Builder fields set
    /// here still take precedence over `INNGEST_*` env vars the way
    /// [`InngestConfig::merged_with_env`] documents; call
    /// `config.merged_with_env(...)` yourself first if you need both.
    #[must_use]
    pub fn with_config(mut self, config: InngestConfig) -> Self {
        self.config = config;
        self
    }

    /// Register app-scoped middleware, applied to every function run
    /// and event send in registration order (§4.4).
    #[must_use]
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Swap in a custom [`EventSender`] (e.g. for tests), bypassing the
    /// `reqwest`-backed [`EventClient`] this crate otherwise builds
    /// from `config`.
    #[must_use]
    pub fn with_event_sender(mut self, sender: Arc<dyn EventSender>) -> Self {
        self.event_sender_override = Some(sender);
        self
    }

    /// Register one function. Returns `Err` immediately on a duplicate
    /// or malformed id (§3, §5) rather than deferring to [`Self::build`].
    pub fn register_function(
        mut self,
        definition: FunctionDefinition,
        handler: Arc<dyn FunctionHandler>,
    ) -> Result<Self, ConfigError> {
        self.registry.register(definition, handler)?;
        Ok(self)
    }

    /// Register one function with function-scoped middleware and/or a
    /// paired `onFailure` handler (§3, §4.4). `middleware` runs after
    /// this app's own middleware, nesting innermost.
    pub fn register_function_with(
        mut self,
        definition: FunctionDefinition,
        handler: Arc<dyn FunctionHandler>,
        middleware: Vec<Arc<dyn Middleware>>,
        on_failure_handler: Option<Arc<dyn FunctionHandler>>,
    ) -> Result<Self, ConfigError> {
        self.registry
            .register_with(definition, handler, middleware, on_failure_handler)?;
        Ok(self)
    }

    /// Best-effort dev-server discovery (§4.5 "Mode determination").
    /// If neither an explicit `is_dev` option nor `INNGEST_DEV` is set,
    /// probes the well-known local dev-server addresses and enables
    /// dev mode if one answers. Cloud platform signals are never
    /// overridden by this probe even when it succeeds, since a
    /// deployed app reaching a stray local port is not evidence it's
    /// running in dev.
    pub async fn with_dev_discovery(mut self) -> Self {
        if self.config.is_dev.is_some() {
            return self;
        }
        if matches!(self.config.detect_platform(), inngest_http::Platform::Unknown) {
            if let Some(url) = dev::discover().await {
                info!(url, "local dev server detected, enabling dev mode");
                self.config.is_dev = Some(true);
                self.config.dev_server_url = Some(url.to_string());
            }
        }
        self
    }

    /// Freeze the app into an [`Inngest`] client.
    pub fn build(self) -> Result<Inngest, ConfigError> {
        let registry = self.registry.build();
        let middleware = MiddlewareRegistry::new(self.middleware);

        let raw_event_sender: Arc<dyn EventSender> = self.event_sender_override.clone().unwrap_or_else(|| {
            Arc::new(EventClient::new(
                self.config.event_api_base_url().to_string(),
                self.config.event_key.clone(),
            ))
        });
        // Route every send — the direct client API and the `sendEvent`
        // step tool alike — through `onSendEvent` middleware (§4.4), so
        // neither call site has to remember to apply hooks itself.
        let event_sender: Arc<dyn EventSender> = Arc::new(inngest_engine::MiddlewareEventSender::new(
            raw_event_sender,
            middleware.clone(),
        ));

        let registration_transport = if matches!(self.config.mode(), Mode::Dev) {
            None
        } else {
            Some(Arc::new(ReqwestRegistrationTransport::new(self.config.signing_key.clone()))
                as Arc<dyn inngest_http::RegistrationTransport>)
        };

        let handler = Arc::new(InngestHandler::new(
            registry,
            self.config,
            middleware,
            Some(event_sender.clone()),
            registration_transport,
            self.app_name,
            FRAMEWORK,
        ));

        Ok(Inngest {
            handler,
            events: event_sender,
        })
    }
}

/// The frozen, shareable client an app serves requests through: an
/// axum router (or the raw [`InngestHandler`] for other adapters) plus
/// the event-send collaborator.
#[derive(Clone)]
pub struct Inngest {
    handler: Arc<InngestHandler>,
    events: Arc<dyn EventSender>,
}

impl Inngest {
    /// Build an axum [`axum::Router`] serving this app at `path` (e.g.
    /// `"/api/inngest"`).
    pub fn router(&self, path: &str) -> axum::Router {
        build_router(Arc::clone(&self.handler), path)
    }

    /// Access the framework-agnostic handler directly, for adapters
    /// other than the axum one this crate ships (§1).
    pub fn handler(&self) -> Arc<InngestHandler> {
        Arc::clone(&self.handler)
    }

    /// Send one event to the orchestrator's event API (§5 "Event
    /// sending"). Not retried by the SDK; callers decide whether to
    /// retry a failure.
    pub async fn send_event(&self, event: Event) -> Result<Vec<String>, HttpError> {
        self.send_events(vec![event]).await
    }

    /// Send a batch of events.
    pub async fn send_events(&self, events: Vec<Event>) -> Result<Vec<String>, HttpError> {
        self.events
            .send(&events)
            .await
            .map_err(|e| HttpError::Middleware(MiddlewareError::from(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inngest_types::Trigger;

    #[test]
    fn builds_with_no_functions() {
        let app = InngestApp::new("demo-app").with_config(InngestConfig {
            is_dev: Some(true),
            ..Default::default()
        });
        let client = app.build().unwrap();
        assert_eq!(client.handler().function_count(), 0);
    }

    #[tokio::test]
    async fn registers_a_function_and_builds() {
        let (def, handler) = crate::function::create_function(
            "hello-world",
            Trigger::event("demo/hello.world"),
            |_ctx| Box::pin(async move { Ok(serde_json::json!("Hello, Inngest!")) }),
        );
        let app = InngestApp::new("demo-app")
            .with_config(InngestConfig {
                is_dev: Some(true),
                ..Default::default()
            })
            .register_function(def, handler)
            .unwrap();
        let client = app.build().unwrap();
        assert_eq!(client.handler().function_count(), 1);
    }

    #[test]
    fn duplicate_function_id_is_rejected_eagerly() {
        let (def_a, handler_a) = crate::function::create_function(
            "dup",
            Trigger::event("demo/a"),
            |_ctx| Box::pin(async move { Ok(serde_json::Value::Null) }),
        );
        let (def_b, handler_b) = crate::function::create_function(
            "dup",
            Trigger::event("demo/b"),
            |_ctx| Box::pin(async move { Ok(serde_json::Value::Null) }),
        );
        let app = InngestApp::new("demo-app")
            .register_function(def_a, handler_a)
            .unwrap();
        let err = app.register_function(def_b, handler_b).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateFunctionId(..)));
    }
}
