//! Type-level context accumulation (§4.4, §9).
//!
//! The source SDK leans on structural-typing inference so middleware can
//! *expand* the context type a handler sees. Rust has no equivalent
//! inference, so per spec.md §9 this is realized as an open-schema
//! `serde_json::Value` map with typed accessor helpers — the same shape
//! `neuron-context`'s strategy trait uses for injected state, rather
//! than threading an associated-type chain through every middleware.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Additions a middleware's `transformInput` hook contributes to the run
/// context. Keys from a later middleware overwrite keys from an earlier
/// one with the same name (§8 "transformInput additions compose").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CtxPatch(Map<String, Value>);

impl CtxPatch {
    /// An empty patch — equivalent to a middleware declining to add
    /// anything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Insert a typed value under `key`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.0.insert(key.into(), v);
        }
        self
    }
}

/// The open-schema map of middleware-contributed context, merged into
/// [`RunContextExt`] in registration order.
///
/// Exposed to handlers as typed accessors rather than a raw
/// `serde_json::Value` so call sites read `ctx.ext.get::<UserClaims>("user")`
/// instead of threading `Value::as_object` lookups everywhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunContextExt {
    fields: Map<String, Value>,
}

impl RunContextExt {
    /// An empty extension map — the starting point before any
    /// middleware has run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a patch in. Keys already present are overwritten — this is
    /// what gives later-registered middleware the final say on a
    /// shared key (§8).
    pub fn merge(&mut self, patch: CtxPatch) {
        for (k, v) in patch.0 {
            self.fields.insert(k, v);
        }
    }

    /// Fetch a typed value previously contributed under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.fields
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Fetch the raw JSON value contributed under `key`.
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Whether any middleware has contributed a value under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no middleware has contributed anything yet.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_patch_overwrites_earlier_key() {
        let mut ext = RunContextExt::new();
        ext.merge(CtxPatch::empty().with("k", "m1"));
        ext.merge(CtxPatch::empty().with("k", "m2"));
        assert_eq!(ext.get::<String>("k").unwrap(), "m2");
    }

    #[test]
    fn distinct_keys_from_different_middleware_both_survive() {
        let mut ext = RunContextExt::new();
        ext.merge(CtxPatch::empty().with("a", 1));
        ext.merge(CtxPatch::empty().with("b", 2));
        assert_eq!(ext.get::<i32>("a"), Some(1));
        assert_eq!(ext.get::<i32>("b"), Some(2));
    }

    #[test]
    fn missing_key_is_none() {
        let ext = RunContextExt::new();
        assert_eq!(ext.get::<i32>("nope"), None);
    }
}
