//! Duplicate suppression cache (§4.2, I1, P1).
//!
//! A frame is delivered to local subscribers at most once per `MessageId`,
//! regardless of how many times it is re-heard over the air. The cache is
//! capped and time-boxed (§3 cache caps) rather than growing unboundedly.

use std::collections::VecDeque;

use mesh_types::MessageId;

struct Entry {
    id: MessageId,
    seen_at: u64,
}

/// Bounded, time-boxed set of message ids already delivered locally.
pub struct DedupCache {
    order: VecDeque<Entry>,
    cap: usize,
    ttl_secs: u64,
}

impl DedupCache {
    pub fn new(cap: usize, ttl_secs: u64) -> Self {
        Self {
            order: VecDeque::with_capacity(cap.min(4096)),
            cap,
            ttl_secs,
        }
    }

    /// Returns `true` if `id` has already been seen (and still within its
    /// TTL window); otherwise records it as seen and returns `false`.
    pub fn check_and_insert(&mut self, id: MessageId, now: u64) -> bool {
        self.expire(now);
        if self.order.iter().any(|e| e.id == id) {
            return true;
        }
        if self.order.len() >= self.cap {
            self.order.pop_front();
        }
        self.order.push_back(Entry { id, seen_at: now });
        false
    }

    fn expire(&mut self, now: u64) {
        while let Some(front) = self.order.front() {
            if now.saturating_sub(front.seen_at) >= self.ttl_secs {
                self.order.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Is `id` still tracked (seen and not yet expired/evicted)?
    pub fn contains(&self, id: MessageId) -> bool {
        self.order.iter().any(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_sighting_is_reported_as_duplicate() {
        let mut cache = DedupCache::new(100, 300);
        assert!(!cache.check_and_insert(MessageId(1), 0));
        assert!(cache.check_and_insert(MessageId(1), 1));
    }

    #[test]
    fn entries_expire_after_ttl() {
        let mut cache = DedupCache::new(100, 300);
        cache.check_and_insert(MessageId(1), 0);
        assert!(!cache.check_and_insert(MessageId(1), 300));
    }

    #[test]
    fn cap_evicts_oldest_first() {
        let mut cache = DedupCache::new(2, 300);
        cache.check_and_insert(MessageId(1), 0);
        cache.check_and_insert(MessageId(2), 0);
        cache.check_and_insert(MessageId(3), 0);
        assert_eq!(cache.len(), 2);
        // id 1 was evicted, so it is treated as new again.
        assert!(!cache.check_and_insert(MessageId(1), 0));
    }
}
