//! Top-level client crate for the Inngest durable execution SDK.
//!
//! Wires the lower workspace crates (`inngest-types`, `inngest-step`,
//! `inngest-engine`, `inngest-middleware`, `inngest-http`) into a single
//! `InngestApp` builder and the `create_function` helper an app author
//! actually calls, plus the `reqwest`-backed collaborators
//! (`events::EventClient`, `registration::ReqwestRegistrationTransport`,
//! `dev` discovery) that keep networking out of the lower crates.

pub mod app;
pub mod dev;
pub mod events;
pub mod function;
pub mod registration;

pub use app::{Inngest, InngestApp};
pub use function::{create_function, create_function_with_config, wrap_handler};

/// Re-exports covering the common import surface for apps built on
/// this SDK, so `use inngest::prelude::*;` is enough for a typical
/// `functions.rs`.
pub mod prelude {
    pub use crate::app::{Inngest, InngestApp};
    pub use crate::function::{create_function, create_function_with_config};
    pub use inngest_engine::{HandlerError, RunContext};
    pub use inngest_http::{InngestConfig, Mode};
    pub use inngest_step::StepContext;
    pub use inngest_types::{Event, FunctionConfig, FunctionDefinition, Trigger};
}
