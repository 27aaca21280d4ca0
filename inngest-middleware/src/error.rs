//! Errors raised by middleware hooks.

use inngest_types::SerializedError;
use thiserror::Error;

/// An error raised from within a middleware hook.
///
/// Per spec.md §4.4/§7: "exceptions thrown in hooks propagate as
/// function errors with a `middleware` source tag." This type carries
/// that tag; `inngest-engine` is responsible for mapping it into the
/// function-level rejection it becomes.
#[non_exhaustive]
#[derive(Debug, Error, Clone)]
#[error("middleware error: {inner}")]
pub struct MiddlewareError {
    /// The underlying error.
    pub inner: SerializedError,
}

impl MiddlewareError {
    /// Wrap a message as a middleware error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            inner: SerializedError::new(message).with_name("MiddlewareError"),
        }
    }

    /// Convert to the wire [`SerializedError`], tagging its name so the
    /// `source: "middleware"` annotation survives serialization.
    pub fn into_serialized(self) -> SerializedError {
        self.inner
    }
}

impl From<SerializedError> for MiddlewareError {
    fn from(inner: SerializedError) -> Self {
        Self { inner }
    }
}
