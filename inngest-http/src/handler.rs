//! The framework-agnostic communication handler (§4.5): dispatch by
//! method, signature discipline, and status-code mapping. This is the
//! piece `axum_handler` wraps; a different host framework would wrap
//! the exact same [`InngestHandler`].

use crate::canonical::{CanonicalRequest, CanonicalResponse, Method};
use crate::config::{InngestConfig, Mode};
use crate::error::{HttpError, ProtocolError, SignatureError};
use crate::registry::FunctionRegistry;
use crate::signature;
use crate::wire::{Capabilities, IntrospectionResponse, RegisteredFunctionConfig, RegistrationPayload, RunRequestBody};
use chrono::Utc;
use inngest_engine::{Engine, RunRequest};
use inngest_middleware::MiddlewareRegistry;
use inngest_step::EventSender;
use inngest_types::{ExecutionResult, FunctionId};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, instrument, warn};

/// Posts a resolved registration payload to the orchestrator
/// out-of-band (§6 "Registration"). `inngest-http` only declares the
/// seam; a `reqwest`-backed implementation lives in the top-level
/// `inngest` crate, matching how `inngest_step::EventSender` keeps the
/// networking dependency out of the lower crates.
#[async_trait::async_trait]
pub trait RegistrationTransport: Send + Sync {
    /// POST `payload` to `url`, returning the raw response body the
    /// orchestrator sent back.
    async fn sync(&self, url: &str, payload: &RegistrationPayload) -> Result<Vec<u8>, HttpError>;
}

/// SDK identity reported in the registration payload and introspection
/// response.
pub const SDK_LANGUAGE: &str = "rust";
/// This crate's version, embedded at compile time.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The complete, framework-agnostic request handler an app builds
/// once and mounts behind one or more HTTP routes.
pub struct InngestHandler {
    registry: FunctionRegistry,
    config: InngestConfig,
    middleware: MiddlewareRegistry,
    event_sender: Option<Arc<dyn EventSender>>,
    registration_transport: Option<Arc<dyn RegistrationTransport>>,
    app_name: String,
    framework: &'static str,
}

impl InngestHandler {
    /// Assemble a handler from its fixed collaborators.
    pub fn new(
        registry: FunctionRegistry,
        config: InngestConfig,
        middleware: MiddlewareRegistry,
        event_sender: Option<Arc<dyn EventSender>>,
        registration_transport: Option<Arc<dyn RegistrationTransport>>,
        app_name: impl Into<String>,
        framework: &'static str,
    ) -> Self {
        Self {
            registry,
            config,
            middleware,
            event_sender,
            registration_transport,
            app_name: app_name.into(),
            framework,
        }
    }

    /// Number of functions currently registered, for app-level
    /// introspection/tests without reaching into private state.
    pub fn function_count(&self) -> usize {
        self.registry.len()
    }

    /// Dispatch one canonical request, never returning an error:
    /// every failure is already folded into a structured response body
    /// and status code (§7 "every path returns a structured response").
    #[instrument(skip(self, req), fields(method = ?req.method))]
    pub async fn handle(&self, req: &CanonicalRequest) -> CanonicalResponse {
        let result = match req.method {
            Method::Get => Ok(self.handle_introspect(req)),
            Method::Put => self.handle_register(req).await,
            Method::Post => self.handle_run(req).await,
        };

        match result {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "request failed");
                self.error_response(&err)
            }
        }
    }

    fn error_response(&self, err: &HttpError) -> CanonicalResponse {
        let status = match err {
            HttpError::Signature(SignatureError::Missing | SignatureError::NoSigningKey) => 401,
            HttpError::Signature(_) => 401,
            HttpError::Protocol(_) => 400,
            HttpError::Config(_) => 400,
            HttpError::Engine(_) => 500,
            HttpError::Middleware(_) => 500,
        };
        CanonicalResponse::json(status, &json!({ "error": err.to_string() }))
    }

    fn base_headers(&self) -> Vec<(String, String)> {
        vec![
            ("x-inngest-sdk".to_string(), format!("{SDK_LANGUAGE}:v{SDK_VERSION}")),
            ("x-inngest-framework".to_string(), self.framework.to_string()),
            ("x-inngest-expected-server-kind".to_string(), "cloud".to_string()),
            ("x-inngest-env".to_string(), self.config.env.clone().unwrap_or_default()),
            (
                "x-inngest-platform".to_string(),
                self.config.detect_platform().as_str().to_string(),
            ),
        ]
    }

    fn sign_if_configured(&self, body: &[u8]) -> Option<(String, String)> {
        let key = self.config.signing_key.as_deref()?;
        let header = signature::sign(body, key, Utc::now().timestamp()).ok()?;
        Some(("x-inngest-signature".to_string(), header))
    }

    fn verify_request(&self, req: &CanonicalRequest) -> Result<(), SignatureError> {
        if matches!(self.config.mode(), Mode::Dev) {
            return Ok(());
        }
        signature::verify(
            req.header("x-inngest-signature"),
            &req.body,
            self.config.signing_key.as_deref(),
            self.config.signing_key_fallback.as_deref(),
            Utc::now(),
            false,
        )
    }

    /// `GET` — introspection (§4.5). Never fails: an invalid or absent
    /// signature only downgrades `authentication_succeeded`, it never
    /// blocks the response.
    fn handle_introspect(&self, req: &CanonicalRequest) -> CanonicalResponse {
        let authentication_succeeded = if matches!(self.config.mode(), Mode::Dev) {
            None
        } else {
            Some(self.verify_request(req).is_ok())
        };

        let body = IntrospectionResponse {
            schema_version: "2024-05-24".to_string(),
            authentication_succeeded,
            function_count: self.registry.len(),
            has_event_key: self.config.event_key.is_some(),
            has_signing_key: self.config.signing_key.is_some(),
            mode: match self.config.mode() {
                Mode::Dev => "dev".to_string(),
                Mode::Cloud => "cloud".to_string(),
            },
            app_id: self.config.app_id.as_ref().map(ToString::to_string),
            env: self.config.env.clone(),
            framework: self.framework.to_string(),
            sdk_language: SDK_LANGUAGE.to_string(),
            sdk_version: SDK_VERSION.to_string(),
            capabilities: Capabilities::default(),
        };

        let mut response = CanonicalResponse::json(200, &body);
        response.headers.extend(self.base_headers());
        response
    }

    /// Build this app's current registration payload, hashed the same
    /// way it will be re-hashed on the next sync, so a diff-free deploy
    /// is detectable by the orchestrator.
    fn registration_payload(&self, serve_url: &str) -> RegistrationPayload {
        let functions: Vec<RegisteredFunctionConfig> =
            self.registry.definitions().map(RegisteredFunctionConfig::from).collect();
        let mut payload = RegistrationPayload {
            url: serve_url.to_string(),
            v: "1".to_string(),
            deploy_type: "ping".to_string(),
            framework: self.framework.to_string(),
            app_name: self.app_name.clone(),
            app_version: None,
            sdk: format!("{SDK_LANGUAGE}:v{SDK_VERSION}"),
            functions,
            hash: String::new(),
            capabilities: Capabilities::default(),
        };
        let mut unhashed = serde_json::to_value(&payload).expect("registration payload always serializes");
        if let Some(obj) = unhashed.as_object_mut() {
            obj.remove("hash");
        }
        payload.hash = inngest_types::sha256_hex(&unhashed);
        payload
    }

    /// `PUT` — registration (§4.5, §6). In-band sync responds directly
    /// with the signed payload; out-of-band sync POSTs it to the
    /// orchestrator through [`RegistrationTransport`] and relays the
    /// reply.
    async fn handle_register(&self, req: &CanonicalRequest) -> Result<CanonicalResponse, HttpError> {
        if !matches!(self.config.mode(), Mode::Dev) {
            self.verify_request(req).map_err(HttpError::from)?;
        }

        let serve_url = req
            .header("x-inngest-serve-origin")
            .map(str::to_string)
            .or_else(|| self.config.serve_origin.clone())
            .unwrap_or_default();
        let payload = self.registration_payload(&serve_url);

        if self.config.allow_in_band_sync && req.header("x-inngest-sync-kind") == Some("in_band") {
            let body = serde_json::to_vec(&payload).expect("registration payload always serializes");
            let mut response = CanonicalResponse::json(200, &payload);
            response.headers.extend(self.base_headers());
            if let Some((name, value)) = self.sign_if_configured(&body) {
                response.headers.push((name, value));
            }
            return Ok(response);
        }

        let Some(transport) = &self.registration_transport else {
            let mut response = CanonicalResponse::json(200, &payload);
            response.headers.extend(self.base_headers());
            return Ok(response);
        };
        let reply = transport.sync(self.config.api_base_url(), &payload).await?;
        Ok(CanonicalResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: reply,
        })
    }

    /// `POST` — run a step (§4.5, §6). Authenticates, decodes the run
    /// request, dispatches to the engine, and maps the outcome to a
    /// status code (§6 "Response codes").
    async fn handle_run(&self, req: &CanonicalRequest) -> Result<CanonicalResponse, HttpError> {
        self.verify_request(req).map_err(HttpError::from)?;

        let fn_id = req
            .query("fnId")
            .ok_or(ProtocolError::MissingField("fnId"))?
            .to_string();
        let requested_run_step = req.query("stepId").map(str::to_string);

        let body: RunRequestBody = serde_json::from_slice(&req.body)
            .map_err(|e| ProtocolError::MalformedBody(e.to_string()))?;

        let registered = self
            .registry
            .get(&FunctionId::new(fn_id.clone()))
            .ok_or_else(|| ProtocolError::UnknownFunction(fn_id.clone()))?;

        let effective_middleware = MiddlewareRegistry::new(
            registered.effective_middleware(self.middleware.middlewares()),
        );
        let engine = Engine::new(effective_middleware, self.event_sender.clone());
        let run_request = RunRequest {
            event: body.event.clone(),
            events: if body.events.is_empty() {
                vec![body.event.clone()]
            } else {
                body.events.clone()
            },
            run_id: body.ctx.run_id.clone(),
            attempt: body.ctx.attempt,
            fn_id: fn_id.clone(),
            memo: body.memo(),
            requested_run_step,
            local_app_id: self.config.app_id.clone(),
            on_failure_handler: registered.on_failure_handler.clone(),
        };

        let outcome = engine.run(registered.handler.as_ref(), run_request).await?;
        let status = match &outcome.result {
            ExecutionResult::FunctionResolved { .. } => 200,
            ExecutionResult::StepsPlanned { .. } | ExecutionResult::StepRan { .. } => 206,
            ExecutionResult::StepNotFound { .. } => 400,
            ExecutionResult::FunctionRejected { non_retriable, .. } => {
                if *non_retriable {
                    400
                } else {
                    error!(fn_id = %fn_id, "function run failed, retriable");
                    500
                }
            }
        };

        let response_body = serde_json::to_vec(&outcome.body).expect("engine body always serializes");
        let mut response = CanonicalResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: response_body.clone(),
        };
        response.headers.extend(self.base_headers());
        if let Some((name, value)) = self.sign_if_configured(&response_body) {
            response.headers.push((name, value));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FunctionRegistryBuilder;
    use inngest_engine::{FunctionHandler, HandlerError, RunContext};
    use inngest_types::{FunctionDefinition, Trigger};

    struct EchoHandler;

    #[async_trait::async_trait]
    impl FunctionHandler for EchoHandler {
        async fn call(&self, ctx: RunContext) -> Result<serde_json::Value, HandlerError> {
            Ok(ctx.event.data.clone())
        }
    }

    fn dev_handler() -> InngestHandler {
        let mut builder = FunctionRegistryBuilder::new();
        builder
            .register(
                FunctionDefinition::new("echo", Trigger::event("demo/echo")),
                Arc::new(EchoHandler),
            )
            .unwrap();
        InngestHandler::new(
            builder.build(),
            InngestConfig {
                is_dev: Some(true),
                ..Default::default()
            },
            MiddlewareRegistry::empty(),
            None,
            None,
            "demo-app",
            "axum",
        )
    }

    fn run_request_body(fn_id: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "event": {"name": "demo/echo", "data": {"hello": "world"}},
            "events": [],
            "steps": {},
            "ctx": {"run_id": "run-1", "attempt": 0, "fn_id": fn_id},
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn dev_mode_post_resolves_without_signature() {
        let handler = dev_handler();
        let req = CanonicalRequest::new(
            Method::Post,
            vec![],
            vec![("fnId".to_string(), "echo".to_string())],
            run_request_body("echo"),
        );
        let response = handler.handle(&req).await;
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn unknown_function_returns_400() {
        let handler = dev_handler();
        let req = CanonicalRequest::new(
            Method::Post,
            vec![],
            vec![("fnId".to_string(), "missing".to_string())],
            run_request_body("missing"),
        );
        let response = handler.handle(&req).await;
        assert_eq!(response.status, 400);
    }

    #[tokio::test]
    async fn missing_fn_id_query_param_returns_400() {
        let handler = dev_handler();
        let req = CanonicalRequest::new(Method::Post, vec![], vec![], run_request_body("echo"));
        let response = handler.handle(&req).await;
        assert_eq!(response.status, 400);
    }

    #[tokio::test]
    async fn introspection_reports_function_count() {
        let handler = dev_handler();
        let req = CanonicalRequest::new(Method::Get, vec![], vec![], vec![]);
        let response = handler.handle(&req).await;
        assert_eq!(response.status, 200);
        let value: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(value["function_count"], 1);
        assert_eq!(value["mode"], "dev");
    }

    #[tokio::test]
    async fn cloud_mode_post_without_signature_is_rejected() {
        let mut builder = FunctionRegistryBuilder::new();
        builder
            .register(
                FunctionDefinition::new("echo", Trigger::event("demo/echo")),
                Arc::new(EchoHandler),
            )
            .unwrap();
        let handler = InngestHandler::new(
            builder.build(),
            InngestConfig {
                is_dev: Some(false),
                signing_key: Some(
                    "signkey-test-f00f3005a3666b359a79c2bc3380ce2715e62727ac461ae1a2618f8766029c9f".to_string(),
                ),
                ..Default::default()
            },
            MiddlewareRegistry::empty(),
            None,
            None,
            "demo-app",
            "axum",
        );
        let req = CanonicalRequest::new(
            Method::Post,
            vec![],
            vec![("fnId".to_string(), "echo".to_string())],
            run_request_body("echo"),
        );
        let response = handler.handle(&req).await;
        assert_eq!(response.status, 401);
    }
}
