//! The framework-agnostic request/response shapes (§4.5) every
//! adapter converts to and from. `inngest_http::axum_handler` is the
//! one concrete adapter this crate ships; other host frameworks are
//! out of scope (§1) but would plug in here the same way.

use std::collections::HashMap;

/// The three HTTP methods the communication handler dispatches on
/// (§4.5 "Dispatch table by method").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Introspection.
    Get,
    /// Registration.
    Put,
    /// Function run.
    Post,
}

/// A framework-neutral description of an incoming orchestrator
/// request. Headers and query parameters are case-insensitively keyed
/// by lowercasing at construction time.
#[derive(Debug, Clone)]
pub struct CanonicalRequest {
    /// The HTTP method.
    pub method: Method,
    /// Lowercased header name to value.
    headers: HashMap<String, String>,
    /// Raw (un-lowercased) query parameters.
    query: HashMap<String, String>,
    /// The already-buffered request body.
    pub body: Vec<u8>,
}

impl CanonicalRequest {
    /// Construct a canonical request from its parts.
    pub fn new(
        method: Method,
        headers: impl IntoIterator<Item = (String, String)>,
        query: impl IntoIterator<Item = (String, String)>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            method,
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
            query: query.into_iter().collect(),
            body,
        }
    }

    /// Look up a header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Look up a query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

/// A framework-neutral outgoing response. Streaming is not modeled
/// here — this crate's one adapter never streams (§4.5, matching
/// [`crate::platform::Platform::supports_streaming`] for every
/// platform axum serves).
#[derive(Debug, Clone)]
pub struct CanonicalResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, in emission order.
    pub headers: Vec<(String, String)>,
    /// The response body bytes.
    pub body: Vec<u8>,
}

impl CanonicalResponse {
    /// Build a JSON response with the given status code.
    pub fn json(status: u16, value: &impl serde::Serialize) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}
