//! Duration and timestamp values accepted by `sleep`/`sleepUntil`/
//! `waitForEvent`.
//!
//! The wire format is always a string: either a humantime-style
//! duration (`"1m"`, `"2h"`) or an ISO-8601 timestamp. [`DurationSpec`]
//! and [`TimeSpec`] normalize whatever the caller passed into that
//! string before it becomes part of an [`crate::op::Op`]'s `opts`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Error produced when a caller-supplied duration or timestamp cannot
/// be parsed. This is always a non-retriable user error (§4.2).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeSpecError {
    /// The string did not parse as a humantime duration or an ISO-8601
    /// timestamp.
    #[error("invalid duration or timestamp: {0}")]
    Invalid(String),
}

/// A duration accepted by `sleep`. Accepts millisecond integers,
/// humantime strings (`"1m"`, `"2h30m"`), or a pre-built
/// [`std::time::Duration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationSpec(Duration);

impl DurationSpec {
    /// The duration in whole milliseconds.
    pub fn as_millis(&self) -> u128 {
        self.0.as_millis()
    }

    /// The wire-format string: `"<ms>ms"` rendering normalized to a
    /// plain millisecond count, matching the `opts.timeout` field the
    /// orchestrator expects.
    pub fn to_wire_string(&self) -> String {
        format!("{}ms", self.0.as_millis())
    }
}

impl From<Duration> for DurationSpec {
    fn from(d: Duration) -> Self {
        Self(d)
    }
}

impl From<u64> for DurationSpec {
    /// Milliseconds.
    fn from(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }
}

impl TryFrom<&str> for DurationSpec {
    type Error = TimeSpecError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        humantime::parse_duration(s)
            .map(Self)
            .map_err(|_| TimeSpecError::Invalid(s.to_string()))
    }
}

/// A point in time accepted by `sleepUntil`. Accepts an ISO-8601 string
/// or a `chrono::DateTime<Utc>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpec(DateTime<Utc>);

impl TimeSpec {
    /// The wire-format string: RFC 3339 / ISO-8601.
    pub fn to_wire_string(&self) -> String {
        self.0.to_rfc3339()
    }

    /// The underlying timestamp.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for TimeSpec {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl TryFrom<&str> for TimeSpec {
    type Error = TimeSpecError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|_| TimeSpecError::Invalid(s.to_string()))
    }
}

/// Duration in milliseconds with a stable JSON wire format — serializes
/// as a plain integer, not serde's `{"secs":N,"nanos":N}` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DurationMs(u64);

impl DurationMs {
    /// Zero duration.
    pub const ZERO: Self = Self(0);

    /// Construct from a millisecond count.
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// The value in milliseconds.
    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl From<Duration> for DurationMs {
    fn from(d: Duration) -> Self {
        Self(d.as_millis() as u64)
    }
}

impl From<DurationMs> for Duration {
    fn from(d: DurationMs) -> Self {
        Duration::from_millis(d.0)
    }
}

impl Default for DurationMs {
    fn default() -> Self {
        Self::ZERO
    }
}
