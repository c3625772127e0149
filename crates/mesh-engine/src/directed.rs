//! Directed-frame targeting and friend-request retry (§4.5, §4.6).
//!
//! Direct messages and friend requests share the directed frame shape but
//! differ in delivery guarantees: a direct message is fire-and-forget (no
//! ack, no retry — the sender has no way to know it arrived), while a
//! friend request is retried on a timer until the target sends a
//! friendRequest of its own (the mutual-add shortcut), or the retry budget
//! is exhausted. Acknowledgments are explicitly out of scope (§1 Non-goals).

use std::collections::HashMap;

use mesh_types::{DirectedFrame, FrameType, MessageId, NodeHash};

/// Build a directed frame addressed to `target`, only for a local send —
/// `sender_hash` is always this node's own hash here, never attacker input.
pub fn build_directed_frame(
    frame_type: FrameType,
    sender_hash: NodeHash,
    target_hash: NodeHash,
    timestamp: u32,
    text: Vec<u8>,
    ttl: u8,
) -> DirectedFrame {
    DirectedFrame {
        frame_type,
        ttl,
        msg_id_hash: MessageId::generate().0,
        sender_hash,
        target_hash,
        timestamp,
        text,
    }
}

/// Is a directed frame addressed to this node (§4.5: "directed delivery is
/// targetHash-exact, not a prefix or network-wide match")?
pub fn is_addressed_to(frame: &DirectedFrame, local_hash: NodeHash) -> bool {
    frame.target_hash == local_hash
}

struct PendingRequest {
    frame: DirectedFrame,
    attempts: u32,
    next_retry_at_ms: u64,
}

/// Tracks outstanding friend requests, retrying on a timer up to a
/// configured attempt budget (§4.6).
pub struct FriendRequestTracker {
    pending: HashMap<NodeHash, PendingRequest>,
    retry_interval_ms: u64,
    max_attempts: u32,
}

impl FriendRequestTracker {
    pub fn new(retry_interval_ms: u64, max_attempts: u32) -> Self {
        Self {
            pending: HashMap::new(),
            retry_interval_ms,
            max_attempts,
        }
    }

    /// Register a freshly sent friend request for retry tracking.
    pub fn register(&mut self, frame: DirectedFrame, now_ms: u64) {
        self.pending.insert(
            frame.target_hash,
            PendingRequest {
                frame,
                attempts: 1,
                next_retry_at_ms: now_ms + self.retry_interval_ms,
            },
        );
    }

    /// Stop retrying a pending request to `target` because they sent us a
    /// friend request of their own (§4.6's mutual-add shortcut) — there is
    /// nothing left to retry once both sides have each other's code.
    pub fn cancel(&mut self, target: NodeHash) {
        self.pending.remove(&target);
    }

    /// Collect the frames due for resend at `now_ms`, dropping any request
    /// that has exhausted its attempt budget (§4.6: "gives up silently
    /// after the retry budget, no error surfaced to the sender").
    pub fn tick(&mut self, now_ms: u64) -> Vec<DirectedFrame> {
        let mut due = Vec::new();
        self.pending.retain(|_, req| {
            if req.attempts >= self.max_attempts {
                return false;
            }
            if now_ms >= req.next_retry_at_ms {
                req.attempts += 1;
                req.next_retry_at_ms = now_ms + self.retry_interval_ms;
                due.push(req.frame.clone());
            }
            true
        });
        due
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(target: NodeHash) -> DirectedFrame {
        build_directed_frame(
            FrameType::FriendRequest,
            NodeHash(1),
            target,
            0,
            b"alice|0001".to_vec(),
            5,
        )
    }

    #[test]
    fn retries_until_cancelled() {
        let mut tracker = FriendRequestTracker::new(3000, 5);
        tracker.register(sample(NodeHash(9)), 0);
        assert!(tracker.tick(2999).is_empty());
        assert_eq!(tracker.tick(3000).len(), 1);
        tracker.cancel(NodeHash(9));
        assert_eq!(tracker.pending_count(), 0);
        assert!(tracker.tick(6000).is_empty());
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut tracker = FriendRequestTracker::new(1000, 2);
        tracker.register(sample(NodeHash(9)), 0);
        assert_eq!(tracker.tick(1000).len(), 1);
        assert!(tracker.tick(2000).is_empty());
        assert_eq!(tracker.pending_count(), 0);
    }

    #[test]
    fn directed_frame_targeting_is_exact() {
        let frame = sample(NodeHash(9));
        assert!(is_addressed_to(&frame, NodeHash(9)));
        assert!(!is_addressed_to(&frame, NodeHash(10)));
    }
}
