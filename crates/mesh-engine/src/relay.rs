//! Controlled-flood relay scheduling (§4.2, §4.3, I2, I3, P2, P3).
//!
//! Two concerns are kept separate here, mirroring §4.3's description of the
//! relay path as "decide, then schedule":
//!
//! - [`RelayTracker`] decides *whether* a frame is still worth relaying at
//!   all, per the strict reading of I2 recorded in DESIGN.md: a `MessageId`
//!   is relayed again only if the new copy's post-decrement TTL is strictly
//!   higher than any TTL this node has already put on air for that id, *and*
//!   at least `relay_spacing_ms` has passed since that id was last relayed.
//!   A copy that arrives with less remaining reach than one already relayed
//!   carries no new information for the rest of the mesh; the spacing floor
//!   catches the case where a higher-TTL copy arrives as part of the same
//!   burst an attacker (or a jittery peer) could otherwise use to force
//!   rapid-fire re-relays of one id.
//! - [`RelayQueue`] decides *when*: queued frames are drained one at a time,
//!   spaced at least `relay_spacing_ms` apart plus a random jitter, so a
//!   burst of duplicate inbound frames doesn't turn into a burst of
//!   outbound advertising that collides with everyone else's.

use std::collections::{HashMap, VecDeque};

use mesh_types::{Frame, MessageId};
use rand::Rng;

/// Per-message-id relay bookkeeping: the best (highest) outgoing TTL
/// already relayed, and when that relay was enqueued.
#[derive(Debug, Clone, Copy)]
struct RelayRecord {
    best_ttl: u8,
    last_relayed_at_ms: u64,
    /// Wall-clock (unix seconds) counterpart of `last_relayed_at_ms`, used
    /// only by [`RelayTracker::prune_expired`] — the relay-spacing gate
    /// needs the engine's relative millisecond clock, but eviction (§4.7:
    /// "evict RelayTimestamp older than 5 minutes") is naturally expressed
    /// against wall-clock time like every other cache in this crate.
    last_relayed_at_secs: u64,
}

/// Tracks, per message id, the highest outgoing TTL already relayed and
/// when it was last relayed.
#[derive(Debug, Default)]
pub struct RelayTracker {
    records: HashMap<MessageId, RelayRecord>,
}

impl RelayTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Should a frame whose *post-decrement* TTL would be `outgoing_ttl` be
    /// relayed right now? Two independent gates must both pass (§4.2's
    /// Open Question resolution: the strict TTL high-water mark applies
    /// "in addition to the 50 ms spacing gate", not instead of it):
    /// the new copy's TTL must strictly exceed any already relayed, and at
    /// least `min_spacing_ms` must have passed since this message id was
    /// last relayed. Relay time is recorded at enqueue (this call), not at
    /// actual transmit, per §4.2.
    pub fn should_relay(
        &mut self,
        id: MessageId,
        outgoing_ttl: u8,
        now_ms: u64,
        min_spacing_ms: u64,
        now_secs: u64,
    ) -> bool {
        match self.records.get(&id).copied() {
            Some(rec) if outgoing_ttl <= rec.best_ttl => false,
            Some(rec) if now_ms.saturating_sub(rec.last_relayed_at_ms) < min_spacing_ms => false,
            _ => {
                self.records.insert(
                    id,
                    RelayRecord {
                        best_ttl: outgoing_ttl,
                        last_relayed_at_ms: now_ms,
                        last_relayed_at_secs: now_secs,
                    },
                );
                true
            }
        }
    }

    /// Drop tracking entries the dedup cache no longer remembers; called
    /// from the maintenance tick alongside [`crate::dedup::DedupCache`]
    /// expiry so relay bookkeeping can't outlive the window it supports.
    pub fn retain_known(&mut self, known: impl Fn(&MessageId) -> bool) {
        self.records.retain(|id, _| known(id));
    }

    /// Drop tracking entries older than `ttl_secs` in their own right
    /// (§4.7: "evict `RelayTimestamp` older than 5 minutes"), independent of
    /// the dedup cache's own retention — a deployment can tune the two
    /// windows separately.
    pub fn prune_expired(&mut self, now_secs: u64, ttl_secs: u64) {
        self.records
            .retain(|_, rec| now_secs.saturating_sub(rec.last_relayed_at_secs) < ttl_secs);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Spacing- and jitter-gated queue of frames awaiting relay (§4.3).
pub struct RelayQueue {
    queue: VecDeque<Frame>,
    spacing_ms: u64,
    jitter_range_ms: (u64, u64),
    last_sent_at_ms: Option<u64>,
}

impl RelayQueue {
    pub fn new(spacing_ms: u64, jitter_range_ms: (u64, u64)) -> Self {
        Self {
            queue: VecDeque::new(),
            spacing_ms,
            jitter_range_ms,
            last_sent_at_ms: None,
        }
    }

    pub fn push(&mut self, frame: Frame) {
        self.queue.push_back(frame);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// If enough time has elapsed since the last relay was sent, pop and
    /// return the next frame to relay. `now_ms` is a monotonic millisecond
    /// clock (the engine uses `tokio::time::Instant`-derived millis so this
    /// module stays independent of any particular clock type).
    pub fn poll(&mut self, now_ms: u64, rng: &mut impl Rng) -> Option<Frame> {
        if self.queue.is_empty() {
            return None;
        }
        let due = match self.last_sent_at_ms {
            None => true,
            Some(last) => {
                let jitter = rng.gen_range(self.jitter_range_ms.0..=self.jitter_range_ms.1);
                now_ms.saturating_sub(last) >= self.spacing_ms + jitter
            }
        };
        if !due {
            return None;
        }
        let frame = self.queue.pop_front();
        if frame.is_some() {
            self.last_sent_at_ms = Some(now_ms);
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::{BroadcastFrame, FrameType, NodeHash};

    fn sample_frame() -> Frame {
        Frame::Broadcast(BroadcastFrame {
            frame_type: FrameType::Message,
            ttl: 3,
            msg_id_hash: 1,
            sender_hash: NodeHash(1),
            timestamp: 0,
            latitude: f32::NAN,
            longitude: f32::NAN,
            text: vec![],
        })
    }

    #[test]
    fn first_relay_of_a_message_id_is_allowed() {
        let mut tracker = RelayTracker::new();
        assert!(tracker.should_relay(MessageId(1), 4, 0, 50, 0));
    }

    #[test]
    fn lower_or_equal_ttl_copy_is_not_relayed_again() {
        let mut tracker = RelayTracker::new();
        assert!(tracker.should_relay(MessageId(1), 4, 0, 50, 0));
        assert!(!tracker.should_relay(MessageId(1), 4, 1000, 50, 1));
        assert!(!tracker.should_relay(MessageId(1), 3, 1000, 50, 1));
    }

    #[test]
    fn strictly_higher_ttl_copy_is_relayed_again_after_spacing_elapses() {
        let mut tracker = RelayTracker::new();
        assert!(tracker.should_relay(MessageId(1), 2, 0, 50, 0));
        assert!(tracker.should_relay(MessageId(1), 4, 60, 50, 0));
    }

    #[test]
    fn strictly_higher_ttl_copy_is_withheld_until_spacing_elapses() {
        let mut tracker = RelayTracker::new();
        assert!(tracker.should_relay(MessageId(1), 2, 0, 50, 0));
        assert!(!tracker.should_relay(MessageId(1), 4, 10, 50, 0));
    }

    #[test]
    fn prune_expired_evicts_entries_past_their_own_ttl_independent_of_dedup() {
        let mut tracker = RelayTracker::new();
        tracker.should_relay(MessageId(1), 4, 0, 50, 0);
        tracker.should_relay(MessageId(2), 4, 0, 50, 100);
        tracker.prune_expired(300, 300);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn queue_withholds_until_spacing_elapsed() {
        let mut queue = RelayQueue::new(50, (0, 0));
        let mut rng = rand::thread_rng();
        queue.push(sample_frame());
        queue.push(sample_frame());
        assert!(queue.poll(0, &mut rng).is_some());
        assert!(queue.poll(10, &mut rng).is_none());
        assert!(queue.poll(60, &mut rng).is_some());
    }
}
