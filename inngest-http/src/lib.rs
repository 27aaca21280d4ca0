//! The HTTP communication boundary (§4.5): the framework-neutral
//! [`handler::InngestHandler`] dispatch logic, its axum adapter, and
//! the wire formats it speaks to the orchestrator.
//!
//! Everything upstream of this crate (`inngest-engine` and below) is
//! transport-agnostic; this is the one place HTTP status codes,
//! headers, and axum types appear.

pub mod axum_handler;
pub mod canonical;
pub mod config;
pub mod error;
pub mod handler;
pub mod platform;
pub mod registry;
pub mod signature;
pub mod wire;

pub use axum_handler::build_router;
pub use canonical::{CanonicalRequest, CanonicalResponse, Method};
pub use config::{InngestConfig, Mode};
pub use error::{HttpError, ProtocolError, SignatureError};
pub use handler::{InngestHandler, RegistrationTransport};
pub use platform::Platform;
pub use registry::{FunctionRegistry, FunctionRegistryBuilder, RegisteredFunction};
pub use wire::{IntrospectionResponse, RegistrationPayload, RunRequestBody};
