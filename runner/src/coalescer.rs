use std::time::Duration;
use tokio::time::Instant;
use zoyla_report::progress::ProgressSnapshot;

/// What the coalescer decided to do with an offered snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Deliver now. Any pending snapshot has been discarded.
    Deliver(ProgressSnapshot),
    /// Stored as pending, a deferred delivery is due at `deadline`.
    Deferred { deadline: Instant },
    /// Replaced the already pending snapshot, the deadline is unchanged.
    Coalesced,
    /// The terminal snapshot was already delivered for this run.
    Dropped,
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Idle,
    Pending {
        snapshot: ProgressSnapshot,
        deadline: Instant,
    },
}

/// Rate limits progress snapshots without ever losing the terminal one.
///
/// Time is passed in by the caller, the coalescer never sleeps. Whoever owns
/// it is expected to call [`ProgressCoalescer::fire`] once [`deadline`] is
/// reached.
///
/// [`deadline`]: ProgressCoalescer::deadline
#[derive(Debug)]
pub struct ProgressCoalescer {
    interval: Duration,
    last_delivered: Option<Instant>,
    slot: Slot,
    finished: bool,
}

impl ProgressCoalescer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_delivered: None,
            slot: Slot::Idle,
            finished: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn offer(&mut self, snapshot: ProgressSnapshot, now: Instant) -> Admission {
        if self.finished {
            return Admission::Dropped;
        }

        let interval_elapsed = self
            .last_delivered
            .map_or(true, |last| now.duration_since(last) >= self.interval);

        if snapshot.is_terminal() || interval_elapsed {
            self.finished = snapshot.is_terminal();
            self.slot = Slot::Idle;
            self.last_delivered = Some(now);
            return Admission::Deliver(snapshot);
        }

        if let Slot::Pending {
            snapshot: pending, ..
        } = &mut self.slot
        {
            *pending = snapshot;
            return Admission::Coalesced;
        }

        // The first offer of a run always delivers, so `last_delivered` is set.
        let deadline = self
            .last_delivered
            .map_or(now, |last| last + self.interval);
        self.slot = Slot::Pending { snapshot, deadline };
        Admission::Deferred { deadline }
    }

    /// Releases the pending snapshot once its deadline has passed.
    pub fn fire(&mut self, now: Instant) -> Option<ProgressSnapshot> {
        let due = matches!(&self.slot, Slot::Pending { deadline, .. } if *deadline <= now);
        if !due {
            return None;
        }

        match std::mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Pending { snapshot, .. } => {
                self.last_delivered = Some(now);
                Some(snapshot)
            }
            Slot::Idle => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        match &self.slot {
            Slot::Pending { deadline, .. } => Some(*deadline),
            Slot::Idle => None,
        }
    }

    pub fn has_pending(&self) -> bool {
        matches!(self.slot, Slot::Pending { .. })
    }

    /// Forgets pending and delivered state, ready for the next run.
    pub fn reset(&mut self) {
        self.slot = Slot::Idle;
        self.last_delivered = None;
        self.finished = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(200);

    fn snapshot(completed: u32, total: u32) -> ProgressSnapshot {
        ProgressSnapshot::new(completed, total, completed, 0, 0.0, 0.0, 0.0)
    }

    #[test]
    fn should_deliver_first_snapshot_immediately() {
        let mut coalescer = ProgressCoalescer::new(INTERVAL);
        let now = Instant::now();
        assert_eq!(
            coalescer.offer(snapshot(1, 100), now),
            Admission::Deliver(snapshot(1, 100))
        );
    }

    #[test]
    fn should_defer_until_interval_elapses_and_keep_latest() {
        let mut coalescer = ProgressCoalescer::new(INTERVAL);
        let start = Instant::now();
        coalescer.offer(snapshot(1, 100), start);

        let deadline = start + INTERVAL;
        assert_eq!(
            coalescer.offer(snapshot(2, 100), start + Duration::from_millis(10)),
            Admission::Deferred { deadline }
        );
        assert_eq!(
            coalescer.offer(snapshot(3, 100), start + Duration::from_millis(20)),
            Admission::Coalesced
        );
        assert_eq!(coalescer.deadline(), Some(deadline));

        assert_eq!(coalescer.fire(start + Duration::from_millis(150)), None);
        assert_eq!(coalescer.fire(deadline), Some(snapshot(3, 100)));
        assert!(!coalescer.has_pending());
        assert_eq!(coalescer.fire(deadline), None);
    }

    #[test]
    fn should_deliver_terminal_snapshot_without_delay_and_drop_pending() {
        let mut coalescer = ProgressCoalescer::new(INTERVAL);
        let start = Instant::now();
        coalescer.offer(snapshot(1, 10), start);
        coalescer.offer(snapshot(5, 10), start + Duration::from_millis(5));

        assert_eq!(
            coalescer.offer(snapshot(10, 10), start + Duration::from_millis(6)),
            Admission::Deliver(snapshot(10, 10))
        );
        assert_eq!(coalescer.deadline(), None);
        assert_eq!(coalescer.fire(start + INTERVAL), None);
    }

    #[test]
    fn should_drop_snapshots_after_terminal_until_reset() {
        let mut coalescer = ProgressCoalescer::new(INTERVAL);
        let start = Instant::now();
        coalescer.offer(snapshot(10, 10), start);

        assert_eq!(
            coalescer.offer(snapshot(9, 10), start + Duration::from_secs(1)),
            Admission::Dropped
        );

        coalescer.reset();
        assert_eq!(
            coalescer.offer(snapshot(1, 10), start + Duration::from_secs(1)),
            Admission::Deliver(snapshot(1, 10))
        );
    }

    #[test]
    fn should_deliver_directly_when_interval_already_elapsed() {
        let mut coalescer = ProgressCoalescer::new(INTERVAL);
        let start = Instant::now();
        coalescer.offer(snapshot(1, 100), start);
        assert!(matches!(
            coalescer.offer(snapshot(2, 100), start + INTERVAL),
            Admission::Deliver(_)
        ));
    }

    #[test]
    fn should_bound_delivery_rate_and_end_with_terminal_snapshot() {
        let mut coalescer = ProgressCoalescer::new(INTERVAL);
        let start = Instant::now();
        let mut delivered = Vec::new();

        for step in 1..=100u32 {
            let now = start + Duration::from_millis(10 * step as u64);
            if let Some(fired) = coalescer.fire(now) {
                delivered.push((now, fired));
            }
            if let Admission::Deliver(direct) = coalescer.offer(snapshot(step, 100), now) {
                delivered.push((now, direct));
            }
        }

        assert!(delivered.len() <= 6, "delivered {}", delivered.len());
        assert_eq!(delivered.last().unwrap().1.completed, 100);
        for pair in delivered.windows(2) {
            let gap = pair[1].0.duration_since(pair[0].0);
            assert!(gap >= INTERVAL || pair[1].1.is_terminal());
        }
    }
}
