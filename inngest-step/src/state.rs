//! Shared, per-invocation state every toolkit call consults before
//! returning — the `Arc<Mutex<EngineState>>` mentioned in this crate's
//! module docs, mirroring how `neuron-loop`'s hooks share turn state.

use inngest_types::Op;

/// Mutable state threaded through one function invocation. Lives
/// behind an `Arc<Mutex<_>>` so that concurrently-polled step futures
/// (e.g. under `futures::join!`) can each register their discovered op
/// without the caller needing to serialize them by hand.
#[derive(Debug, Default)]
pub struct EngineState {
    pos: u32,
    planned: Vec<Op>,
    ran: Option<Op>,
    before_memoization_fired: bool,
    after_memoization_fired: bool,
}

impl EngineState {
    /// Fresh state for a new invocation, position counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume and return the next step position, advancing the
    /// counter. Every toolkit call takes exactly one position,
    /// regardless of whether it ultimately plans, runs, or replays
    /// from the memo.
    pub fn next_pos(&mut self) -> u32 {
        let pos = self.pos;
        self.pos += 1;
        pos
    }

    /// Record a newly discovered, not-yet-run op. `Err` when `op.id`
    /// collides with an op already planned or run this invocation
    /// (§4.1) — distinct positions hashing to the same id indicates a
    /// sha1 collision or a toolkit bug, never a normal replay mismatch.
    pub fn record_planned(&mut self, op: Op) -> Result<(), String> {
        if self.planned.iter().any(|p| p.id == op.id) || self.ran.as_ref().is_some_and(|r| r.id == op.id) {
            return Err(op.id);
        }
        self.planned.push(op);
        Ok(())
    }

    /// Record the single step that ran inline this invocation
    /// (inline/`requestedRunStep` mode allows at most one).
    pub fn record_ran(&mut self, op: Op) -> Result<(), String> {
        debug_assert!(
            self.ran.is_none(),
            "at most one step may run inline per invocation"
        );
        if self.planned.iter().any(|p| p.id == op.id) {
            return Err(op.id);
        }
        self.ran = Some(op);
        Ok(())
    }

    /// Ops discovered but not yet scheduled, in discovery order.
    pub fn planned(&self) -> &[Op] {
        &self.planned
    }

    /// The step that ran inline this invocation, if any.
    pub fn ran(&self) -> Option<&Op> {
        self.ran.as_ref()
    }

    /// Latch `before_memoization`'s one-shot firing: `true` the first
    /// time this is called for an invocation, `false` on every
    /// subsequent call, so the engine fires the hook exactly once
    /// regardless of how many steps this invocation touches.
    pub fn begin_memo_lookup(&mut self) -> bool {
        if self.before_memoization_fired {
            false
        } else {
            self.before_memoization_fired = true;
            true
        }
    }

    /// Latch `after_memoization`'s one-shot firing, the same way
    /// [`Self::begin_memo_lookup`] does for `before_memoization`: fires
    /// once, on the first step call that finds no memo entry (i.e. the
    /// transition from replaying old work to discovering new work).
    pub fn begin_discovery(&mut self) -> bool {
        if self.after_memoization_fired {
            false
        } else {
            self.after_memoization_fired = true;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inngest_types::OpCode;

    #[test]
    fn positions_increment_monotonically() {
        let mut s = EngineState::new();
        assert_eq!(s.next_pos(), 0);
        assert_eq!(s.next_pos(), 1);
        assert_eq!(s.next_pos(), 2);
    }

    #[test]
    fn duplicate_planned_id_is_rejected() {
        let mut s = EngineState::new();
        let op = Op::new(0, OpCode::StepPlanned, "a", None);
        s.record_planned(op.clone()).unwrap();
        assert!(s.record_planned(op).is_err());
    }

    #[test]
    fn memo_lookup_latch_fires_once() {
        let mut s = EngineState::new();
        assert!(s.begin_memo_lookup());
        assert!(!s.begin_memo_lookup());
        assert!(!s.begin_memo_lookup());
    }

    #[test]
    fn discovery_latch_fires_once() {
        let mut s = EngineState::new();
        assert!(s.begin_discovery());
        assert!(!s.begin_discovery());
    }
}
