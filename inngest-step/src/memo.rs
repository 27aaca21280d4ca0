//! The memo: the orchestrator-supplied record of steps that have
//! already run, keyed by hashed id, consulted before any new op is
//! planned.

use inngest_types::MemoizedOp;
use std::collections::HashMap;

/// A read-only view over the `steps` map the orchestrator sends with
/// each request.
#[derive(Debug, Clone, Default)]
pub struct Memo {
    entries: HashMap<String, MemoizedOp>,
}

impl Memo {
    /// Build a memo from the orchestrator's `steps` map.
    pub fn new(entries: HashMap<String, MemoizedOp>) -> Self {
        Self { entries }
    }

    /// An empty memo, as seen on a function's very first invocation.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a step's recorded result by its hashed id.
    pub fn get(&self, hashed_id: &str) -> Option<&MemoizedOp> {
        self.entries.get(hashed_id)
    }

    /// Whether this step has already run, successfully or not.
    pub fn has_run(&self, hashed_id: &str) -> bool {
        self.entries.contains_key(hashed_id)
    }

    /// Number of steps this memo has recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this memo has no recorded steps.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_memo_has_no_entries() {
        let m = Memo::empty();
        assert!(m.is_empty());
        assert!(!m.has_run("anything"));
    }

    #[test]
    fn lookup_finds_recorded_step() {
        let mut entries = HashMap::new();
        entries.insert(
            "abc".to_string(),
            MemoizedOp {
                id: "abc".to_string(),
                data: Some(json!(42)),
                error: None,
            },
        );
        let m = Memo::new(entries);
        assert!(m.has_run("abc"));
        assert_eq!(m.get("abc").unwrap().data, Some(json!(42)));
        assert!(!m.has_run("xyz"));
    }
}
