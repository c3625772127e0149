//! Periodic self-announcement (§4.4).
//!
//! A node broadcasts an announce frame (`"<nickname>|<friendCode>"`) on a
//! single randomized [4000, 7000)ms interval so peers learn its nickname and
//! friend code without either side sending a friend request.

use rand::Rng;

/// Decides when the next self-announcement is due.
pub struct AnnounceScheduler {
    interval_range_ms: (u64, u64),
    next_due_at_ms: u64,
}

impl AnnounceScheduler {
    pub fn new(interval_range_ms: (u64, u64), now_ms: u64) -> Self {
        let mut scheduler = Self {
            interval_range_ms,
            next_due_at_ms: now_ms,
        };
        scheduler.reschedule(now_ms);
        scheduler
    }

    fn reschedule(&mut self, now_ms: u64) {
        let mut rng = rand::thread_rng();
        let interval = rng.gen_range(self.interval_range_ms.0..=self.interval_range_ms.1);
        self.next_due_at_ms = now_ms + interval;
    }

    /// Is an announce due at `now_ms`? If so, the caller should send the
    /// announce and call [`Self::mark_sent`].
    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms >= self.next_due_at_ms
    }

    /// Record that an announce was just sent, and pick the next interval.
    pub fn mark_sent(&mut self, now_ms: u64) {
        self.reschedule(now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_due_before_interval_elapses() {
        let scheduler = AnnounceScheduler::new((4000, 4000), 0);
        assert!(!scheduler.is_due(3999));
        assert!(scheduler.is_due(4000));
    }

    #[test]
    fn mark_sent_picks_a_new_window() {
        let mut scheduler = AnnounceScheduler::new((1000, 1000), 0);
        assert!(scheduler.is_due(1000));
        scheduler.mark_sent(1000);
        assert!(!scheduler.is_due(1500));
        assert!(scheduler.is_due(2000));
    }
}
