//! The event-send HTTP client (§6 **[ADDED]**): a thin `reqwest`
//! collaborator that posts event batches to the Inngest event API.
//! Kept separate from the core engine so `inngest-step` stays free of
//! a networking dependency — this is the concrete [`EventSender`] the
//! rest of the workspace only knows as a trait object.

use async_trait::async_trait;
use inngest_step::EventSender;
use inngest_types::{Event, SerializedError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{instrument, warn};

/// Failures sending events to the orchestrator. Never retried by the
/// SDK itself (§5) — callers decide whether to retry.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EventSendError {
    /// The underlying HTTP request failed (DNS, connect, timeout, …).
    #[error("event send request failed: {0}")]
    Request(String),

    /// The event API rejected the batch.
    #[error("event API returned {status}: {body}")]
    Rejected {
        /// HTTP status code returned.
        status: u16,
        /// Response body, if any.
        body: String,
    },

    /// No event key is configured; `sendEvent` cannot execute inline.
    #[error("no event key configured")]
    NoEventKey,
}

impl From<EventSendError> for SerializedError {
    fn from(err: EventSendError) -> Self {
        SerializedError::new(err.to_string()).with_name("EventSendError")
    }
}

/// Posts batches of [`Event`] to `{event_api_base_url}/e/{event_key}`.
pub struct EventClient {
    http: reqwest::Client,
    base_url: String,
    event_key: Option<String>,
}

impl EventClient {
    /// Build a client targeting `base_url` (e.g.
    /// [`inngest_http::InngestConfig::event_api_base_url`]) with the
    /// given event key.
    pub fn new(base_url: impl Into<String>, event_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            event_key,
        }
    }

    /// Send a batch of events, returning the ids the orchestrator
    /// assigned to them.
    #[instrument(skip(self, events), fields(count = events.len()))]
    pub async fn send(&self, events: &[Event]) -> Result<Vec<String>, EventSendError> {
        let key = self.event_key.as_deref().ok_or(EventSendError::NoEventKey)?;
        let url = format!("{}/e/{}", self.base_url.trim_end_matches('/'), key);

        let response = self
            .http
            .post(&url)
            .json(events)
            .send()
            .await
            .map_err(|e| EventSendError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "event send rejected");
            return Err(EventSendError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: EventSendResponse = response
            .json()
            .await
            .map_err(|e| EventSendError::Request(e.to_string()))?;
        Ok(body.ids)
    }

    /// Wrap this client in an [`Arc`] behind the [`EventSender`] trait,
    /// for attaching to a [`inngest_engine::Engine`].
    pub fn into_sender(self) -> Arc<dyn EventSender> {
        Arc::new(self)
    }
}

#[derive(serde::Deserialize)]
struct EventSendResponse {
    #[serde(default)]
    ids: Vec<String>,
}

#[async_trait]
impl EventSender for EventClient {
    async fn send(&self, events: &[Event]) -> Result<Vec<String>, SerializedError> {
        EventClient::send(self, events).await.map_err(Into::into)
    }
}
