//! Error taxonomy for the HTTP boundary (§7): signature, protocol, and
//! configuration failures, each mapped to a status code by
//! [`crate::handler::InngestHandler`].

use inngest_engine::EngineError;
use inngest_middleware::MiddlewareError;
use inngest_types::ConfigError;
use thiserror::Error;

/// Failures while validating or producing an `X-Inngest-Signature`
/// header (§4.5 "Signature discipline").
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SignatureError {
    /// No `X-Inngest-Signature` header present where one was required.
    #[error("missing X-Inngest-Signature header")]
    Missing,

    /// The header value could not be parsed as `t=<seconds>&s=<hex>`.
    #[error("malformed X-Inngest-Signature header")]
    Malformed,

    /// The timestamp is older than the replay-protection window.
    #[error("signature timestamp is outside the allowed window")]
    Expired,

    /// Neither the primary nor the fallback signing key produced a
    /// matching HMAC.
    #[error("signature does not match any configured signing key")]
    Mismatch,

    /// No signing key is configured, and one is required (cloud mode).
    #[error("no signing key configured")]
    NoSigningKey,
}

/// Malformed or structurally invalid orchestrator requests (§7 "Protocol
/// error").
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The request body did not deserialize into the expected shape.
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    /// The `fnId` query parameter was missing or named an unregistered
    /// function.
    #[error("unknown function id {0:?}")]
    UnknownFunction(String),

    /// A required query parameter or header was absent.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// The top-level error type the HTTP layer maps to a response.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HttpError {
    /// Signature validation failed.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// The request was structurally invalid.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The function registry or config was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The engine itself failed (an internal assertion, not a user
    /// error).
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A middleware hook raised an error outside of a function run
    /// (e.g. while building a `sendEvent` pipeline).
    #[error(transparent)]
    Middleware(#[from] MiddlewareError),
}
