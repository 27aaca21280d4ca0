//! Wraps a raw [`EventSender`] so that every send — whether it comes
//! from the durable `sendEvent` step tool or a direct client call —
//! runs through the app's `onSendEvent` middleware hooks (§4.4).
//!
//! Grounded on the same "decorate the trait object, don't special-case
//! the call site" shape `neuron_tool::ToolDyn` middleware wrapping
//! uses: callers keep talking to a plain [`EventSender`], unaware
//! they're going through a pipeline.

use async_trait::async_trait;
use inngest_middleware::MiddlewareRegistry;
use inngest_step::EventSender;
use inngest_types::{Event, SerializedError};
use std::sync::Arc;

/// An [`EventSender`] that runs `transformInput`/`transformOutput`
/// `onSendEvent` hooks (forward/reverse registration order, §4.4)
/// around a concrete sender.
pub struct MiddlewareEventSender {
    inner: Arc<dyn EventSender>,
    middleware: MiddlewareRegistry,
}

impl MiddlewareEventSender {
    /// Wrap `inner`, applying `middleware`'s `onSendEvent` hooks to
    /// every call.
    pub fn new(inner: Arc<dyn EventSender>, middleware: MiddlewareRegistry) -> Self {
        Self { inner, middleware }
    }
}

#[async_trait]
impl EventSender for MiddlewareEventSender {
    async fn send(&self, events: &[Event]) -> Result<Vec<String>, SerializedError> {
        let pipeline = self
            .middleware
            .build_send_event()
            .await
            .map_err(|e| e.into_serialized())?;
        let events = pipeline
            .transform_input(events.to_vec())
            .await
            .map_err(|e| e.into_serialized())?;
        let ids = self.inner.send(&events).await?;
        pipeline
            .transform_output(ids)
            .await
            .map_err(|e| e.into_serialized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inngest_middleware::{
        FunctionRunHooks, FunctionRunMeta, Middleware, MiddlewareError, SendEventHooks,
    };
    use std::sync::Mutex;

    struct RecordingSender {
        sent: Mutex<Vec<Vec<Event>>>,
    }

    #[async_trait]
    impl EventSender for RecordingSender {
        async fn send(&self, events: &[Event]) -> Result<Vec<String>, SerializedError> {
            self.sent.lock().unwrap().push(events.to_vec());
            Ok(vec!["evt-1".to_string()])
        }
    }

    struct TaggingHooks;

    #[async_trait]
    impl SendEventHooks for TaggingHooks {
        async fn transform_input(
            &self,
            mut events: Vec<Event>,
        ) -> Result<Vec<Event>, MiddlewareError> {
            for event in &mut events {
                event.data["tagged"] = serde_json::json!(true);
            }
            Ok(events)
        }

        async fn transform_output(&self, ids: Vec<String>) -> Result<Vec<String>, MiddlewareError> {
            Ok(ids.into_iter().map(|id| format!("mw-{id}")).collect())
        }
    }

    struct TaggingMiddleware;

    #[async_trait]
    impl Middleware for TaggingMiddleware {
        fn name(&self) -> &str {
            "tagging"
        }

        async fn on_function_run(
            &self,
            _meta: &FunctionRunMeta,
        ) -> Result<Box<dyn FunctionRunHooks>, MiddlewareError> {
            Ok(Box::new(inngest_middleware::NoopFunctionRunHooks))
        }

        async fn on_send_event(&self) -> Result<Box<dyn SendEventHooks>, MiddlewareError> {
            Ok(Box::new(TaggingHooks))
        }
    }

    #[tokio::test]
    async fn wraps_input_and_output_through_middleware() {
        let inner = Arc::new(RecordingSender {
            sent: Mutex::new(Vec::new()),
        });
        let registry = MiddlewareRegistry::new(vec![Arc::new(TaggingMiddleware)]);
        let sender = MiddlewareEventSender::new(inner.clone(), registry);

        let ids = sender
            .send(&[Event::new("demo/x", serde_json::json!({}))])
            .await
            .unwrap();

        assert_eq!(ids, vec!["mw-evt-1".to_string()]);
        let sent = inner.sent.lock().unwrap();
        assert_eq!(sent[0][0].data["tagged"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn empty_middleware_passes_through_unchanged() {
        let inner = Arc::new(RecordingSender {
            sent: Mutex::new(Vec::new()),
        });
        let sender = MiddlewareEventSender::new(inner, MiddlewareRegistry::empty());
        let ids = sender
            .send(&[Event::new("demo/x", serde_json::json!({}))])
            .await
            .unwrap();
        assert_eq!(ids, vec!["evt-1".to_string()]);
    }
}
