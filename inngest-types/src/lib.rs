//! Canonical data model for the Inngest durable execution SDK:
//! events, typed ids, the Op/step identity hashing scheme, function
//! and trigger definitions, wire error shapes, and the execution
//! result sum type every other crate in this workspace builds on.

pub mod canonical;
pub mod duration;
pub mod error;
pub mod event;
pub mod function;
pub mod id;
pub mod op;
pub mod result;

pub use canonical::{canonical_json, sha1_hex, sha256_hex};
pub use duration::{DurationMs, DurationSpec, TimeSpec, TimeSpecError};
pub use error::{ConfigError, NonRetriableError, SerializedError};
pub use event::Event;
pub use function::{BatchConfig, ConcurrencyConfig, FunctionConfig, FunctionDefinition, RateLimitConfig, Trigger};
pub use id::{AppId, FunctionId, RunId, StepId};
pub use op::{EmptyOpts, MemoizedOp, Op, OpCode, OpOpts};
pub use result::ExecutionResult;
