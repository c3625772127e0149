//! Peer table entries (§3, §4.7).

use serde::{Deserialize, Serialize};

use crate::identity::{FriendCode, NodeHash};

/// An observed peer. Created on first sighting, pruned when offline (I4).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Peer {
    pub hash: NodeHash,
    pub nickname: Option<String>,
    pub friend_code: Option<FriendCode>,
    /// Unix seconds of the last frame received from this peer.
    pub last_seen: u64,
    pub recv_count: u64,
    pub relay_count: u64,
}

impl Peer {
    /// Create a freshly-sighted peer entry.
    pub fn new(hash: NodeHash, now: u64) -> Self {
        Self {
            hash,
            nickname: None,
            friend_code: None,
            last_seen: now,
            recv_count: 0,
            relay_count: 0,
        }
    }

    /// A peer is online iff `now − lastSeen < 60s` (I4).
    pub fn is_online(&self, now: u64) -> bool {
        now.saturating_sub(self.last_seen) < 60
    }

    pub fn mark_seen(&mut self, now: u64) {
        self.last_seen = now;
        self.recv_count += 1;
    }

    pub fn mark_relayed(&mut self) {
        self.relay_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn online_iff_within_60s() {
        let peer = Peer::new(NodeHash(1), 1_000);
        assert!(peer.is_online(1_059));
        assert!(!peer.is_online(1_060));
    }
}
