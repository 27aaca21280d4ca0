//! The out-of-band registration transport: POSTs the function catalog
//! to the orchestrator's sync endpoint and relays the raw reply back
//! to [`inngest_http::InngestHandler`].

use async_trait::async_trait;
use inngest_http::{HttpError, RegistrationPayload, RegistrationTransport};
use tracing::{instrument, warn};

/// A [`RegistrationTransport`] backed by `reqwest`.
pub struct ReqwestRegistrationTransport {
    http: reqwest::Client,
    signing_key: Option<String>,
}

impl ReqwestRegistrationTransport {
    /// Build a transport, optionally signing the outgoing PUT the same
    /// way a function-run response is signed (§4.5).
    pub fn new(signing_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            signing_key,
        }
    }
}

#[async_trait]
impl RegistrationTransport for ReqwestRegistrationTransport {
    #[instrument(skip(self, payload), fields(url = %url))]
    async fn sync(&self, url: &str, payload: &RegistrationPayload) -> Result<Vec<u8>, HttpError> {
        let body = serde_json::to_vec(payload).expect("registration payload always serializes");
        let endpoint = format!("{}/fn/register", url.trim_end_matches('/'));

        let mut request = self.http.put(&endpoint).header("content-type", "application/json");
        if let Some(key) = &self.signing_key {
            if let Ok(header) = inngest_http::signature::sign(&body, key, chrono::Utc::now().timestamp()) {
                request = request.header("x-inngest-signature", header);
            }
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| inngest_http::ProtocolError::MalformedBody(e.to_string()))?;

        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "registration sync rejected");
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| inngest_http::ProtocolError::MalformedBody(e.to_string()).into())
    }
}
