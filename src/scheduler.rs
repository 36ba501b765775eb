//! Millisecond timers driven by a caller-supplied clock.
//!
//! Nothing here reads wall time: hosts pass `now_ms` from their frame clock and
//! simulations pass a synthetic one, so timed behavior is reproducible.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    PickupRelease,
    AnchorScan,
}

#[derive(Clone, Debug)]
struct Timer {
    id: TimerId,
    due_ms: u64,
    kind: TimerKind,
}

#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    timers: Vec<Timer>,
    next_id: u64,
}

impl Scheduler {
    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, kind: TimerKind) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.timers.push(Timer {
            id,
            due_ms: now_ms.saturating_add(delay_ms),
            kind,
        });
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn cancel_kind(&mut self, kind: TimerKind) {
        self.timers.retain(|t| t.kind != kind);
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.timers.iter().any(|t| t.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Removes and returns every timer due at `now_ms`, earliest first.
    pub fn fire_due(&mut self, now_ms: u64) -> Vec<TimerKind> {
        let mut due: Vec<Timer> = Vec::new();
        self.timers.retain(|t| {
            if t.due_ms <= now_ms {
                due.push(t.clone());
                false
            } else {
                true
            }
        });
        due.sort_by_key(|t| (t.due_ms, t.id));
        due.into_iter().map(|t| t.kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_exactly_at_deadline() {
        let mut s = Scheduler::default();
        s.schedule(1_000, 2_000, TimerKind::PickupRelease);
        assert!(s.fire_due(2_999).is_empty());
        assert_eq!(s.fire_due(3_000), vec![TimerKind::PickupRelease]);
        assert!(s.fire_due(10_000).is_empty());
    }

    #[test]
    fn cancel_removes_timer() {
        let mut s = Scheduler::default();
        let id = s.schedule(0, 10, TimerKind::AnchorScan);
        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert!(s.fire_due(100).is_empty());
    }

    #[test]
    fn due_timers_come_out_in_deadline_order() {
        let mut s = Scheduler::default();
        s.schedule(0, 50, TimerKind::PickupRelease);
        s.schedule(0, 10, TimerKind::AnchorScan);
        assert_eq!(
            s.fire_due(100),
            vec![TimerKind::AnchorScan, TimerKind::PickupRelease]
        );
        assert!(s.is_empty());
    }
}
