//! Bounded in-memory log of classified messages (§3, §4.5, §4.7).
//!
//! `EventBus::publish_message` only reaches subscribers already listening
//! at the moment a frame is classified; this log is the replay surface — a
//! presentation layer that attaches late can still page through the last
//! few minutes of chat instead of only ever seeing what arrives after it
//! subscribes.

use std::collections::VecDeque;

use mesh_types::MeshMessage;

struct Entry {
    message: MeshMessage,
    received_at: u64,
}

/// Time-boxed log of delivered [`MeshMessage`]s, pruned on the maintenance
/// tick (§4.7: "evict messages older than 5 minutes from the in-memory
/// log").
pub struct MessageLog {
    entries: VecDeque<Entry>,
    ttl_secs: u64,
}

impl MessageLog {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: VecDeque::new(),
            ttl_secs,
        }
    }

    /// Append a freshly classified message, recorded at `now` (engine
    /// receipt time, not the frame's own `timestamp` field — a relayed
    /// frame's origin timestamp can be arbitrarily old).
    pub fn push(&mut self, message: MeshMessage, now: u64) {
        self.entries.push_back(Entry { message, received_at: now });
    }

    /// Drop entries older than `ttl_secs`; called from the maintenance
    /// tick alongside the other caches.
    pub fn prune(&mut self, now: u64) {
        while let Some(front) = self.entries.front() {
            if now.saturating_sub(front.received_at) >= self.ttl_secs {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// The most recent `n` messages, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&MeshMessage> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).map(|e| &e.message).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::{FrameType, MessageId, NodeHash, Priority};

    fn sample(id: u16) -> MeshMessage {
        MeshMessage {
            id: MessageId(id),
            frame_type: FrameType::Message,
            sender_hash: NodeHash(1),
            nickname: None,
            timestamp: 0,
            content: "hi".to_string(),
            hop_count: 0,
            was_relayed: false,
            priority: Priority::Normal,
            latitude: None,
            longitude: None,
            target_friend_code: None,
        }
    }

    #[test]
    fn prune_evicts_entries_older_than_ttl() {
        let mut log = MessageLog::new(300);
        log.push(sample(1), 0);
        log.push(sample(2), 100);
        log.prune(300);
        assert_eq!(log.len(), 1);
        assert_eq!(log.recent(10)[0].id, MessageId(2));
    }

    #[test]
    fn recent_returns_newest_n_oldest_first() {
        let mut log = MessageLog::new(300);
        for i in 1..=5u16 {
            log.push(sample(i), 0);
        }
        let recent = log.recent(2);
        assert_eq!(recent.iter().map(|m| m.id.0).collect::<Vec<_>>(), vec![4, 5]);
    }
}
