//! Typed ID wrappers for functions, runs, apps, and steps.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrappers prevent mixing up function IDs, run IDs, etc.
/// These are just strings underneath — the protocol doesn't enforce a
/// particular format (the orchestrator assigns `RunId`s; app authors
/// choose `FunctionId`s).
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to `String`.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(AppId, "Unique identifier for an app (a served function catalog).");
typed_id!(FunctionId, "Unique identifier for a function definition, scoped to an app.");
typed_id!(RunId, "Identifier assigned by the orchestrator to one function run.");
typed_id!(StepId, "The hashed identity of a single Op within a run.");
