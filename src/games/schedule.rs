/// Deadline queue owned by a single engine.
///
/// Engines never hold browser timer handles; they schedule steps against the
/// monotonic clock and the host drives them through `pop_due`. Dropping or
/// cancelling the schedule is all the teardown an engine needs.
#[derive(Debug, Clone)]
pub struct Schedule<K> {
    pending: Vec<(f64, u64, K)>,
    seq: u64,
}

impl<K> Default for Schedule<K> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            seq: 0,
        }
    }
}

impl<K> Schedule<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(&mut self, due_ms: f64, step: K) {
        self.seq += 1;
        self.pending.push((due_ms, self.seq, step));
    }

    /// Earliest step whose deadline is `<= now`, with its deadline. Ties resolve
    /// in scheduling order.
    pub fn pop_due(&mut self, now: f64) -> Option<(f64, K)> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, (due, _, _))| *due <= now)
            .min_by(|(_, a), (_, b)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(i, _)| i)?;
        let (due, _, step) = self.pending.swap_remove(idx);
        Some((due, step))
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn cancel_where(&mut self, mut pred: impl FnMut(&K) -> bool) {
        self.pending.retain(|(_, _, k)| !pred(k));
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_due(&self) -> Option<f64> {
        self.pending.iter().map(|(d, _, _)| *d).min_by(f64::total_cmp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_deadline_then_insertion_order() {
        let mut s = Schedule::new();
        s.at(200.0, "late");
        s.at(100.0, "first");
        s.at(100.0, "second");
        assert_eq!(s.pop_due(50.0), None);
        assert_eq!(s.pop_due(300.0), Some((100.0, "first")));
        assert_eq!(s.pop_due(300.0), Some((100.0, "second")));
        assert_eq!(s.pop_due(300.0), Some((200.0, "late")));
        assert!(s.is_empty());
    }

    #[test]
    fn cancelled_steps_never_fire() {
        let mut s = Schedule::new();
        s.at(10.0, 1);
        s.at(20.0, 2);
        s.cancel_where(|k| *k == 1);
        assert_eq!(s.next_due(), Some(20.0));
        s.cancel_all();
        assert_eq!(s.pop_due(1e9), None);
    }
}
