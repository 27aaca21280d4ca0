//! Error shapes exchanged on the wire, plus this crate's own error
//! taxonomy (modeled on `layer0::error`'s per-domain `thiserror` enums).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The wire shape of a step/function error, matching what the
/// orchestrator expects in `steps[id].error` and in a function's final
/// rejection payload.
///
/// `__serialized` is always `true` — its presence (rather than its
/// value) is what lets the orchestrator distinguish a structured error
/// from an arbitrary JSON value a user might have thrown.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerializedError {
    /// The error's type name, e.g. `"Error"`, `"TypeError"`.
    pub name: String,
    /// The human-readable message.
    pub message: String,
    /// A captured stack trace, if any was available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// The underlying cause, if this error wraps another.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<SerializedError>>,
    /// Always `true`. Present so the orchestrator can tell a structured
    /// error apart from a plain JSON value.
    #[serde(rename = "__serialized")]
    pub serialized: bool,
}

impl SerializedError {
    /// Build a `SerializedError` from a plain message. `name` defaults
    /// to `"Error"`, matching the orchestrator's fallback when no type
    /// information is available.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            name: "Error".to_string(),
            message: message.into(),
            stack: None,
            cause: None,
            serialized: true,
        }
    }

    /// Set a specific error type name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Mark this error as non-retriable by wrapping it: the
    /// orchestrator reads [`NonRetriableError::non_retriable`] to skip
    /// further attempts (§4.4).
    pub fn into_non_retriable(self) -> NonRetriableError {
        NonRetriableError {
            inner: self,
            non_retriable: true,
        }
    }
}

impl std::fmt::Display for SerializedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for SerializedError {}

/// Wraps a [`SerializedError`] with the `non_retriable` flag the
/// orchestrator checks before scheduling another attempt.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NonRetriableError {
    /// The underlying error.
    #[serde(flatten)]
    pub inner: SerializedError,
    /// Always `true` for this wrapper — a step/function author opted
    /// out of retries.
    pub non_retriable: bool,
}

/// Errors raised while building or validating a function or app
/// configuration, before any network activity.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A function was registered with an empty id.
    #[error("function id must not be empty")]
    EmptyFunctionId,

    /// A function declared no triggers.
    #[error("function {0:?} must declare at least one trigger")]
    NoTriggers(String),

    /// Two functions in the same app share an id.
    #[error("duplicate function id {0:?} in app {1:?}")]
    DuplicateFunctionId(String, String),

    /// Catch-all for errors surfaced by a dependency this crate does
    /// not otherwise model.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
