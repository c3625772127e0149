//! Peer table: tracks every node hash seen on air (§3, §4.7, I4).

use std::collections::{HashMap, HashSet};

use mesh_types::{FriendCode, NodeHash, Peer};

/// In-memory table of observed peers. Lives inside the engine's single
/// owning task, mutated only by the scan/maintenance loops — no internal
/// locking, matching the single-task ownership model (SPEC_FULL §5).
#[derive(Debug, Default)]
pub struct PeerTable {
    peers: HashMap<NodeHash, Peer>,
    /// Nodes heard at hop-0, i.e. direct neighbors (§3's `DirectNeighborSet`,
    /// GLOSSARY). Populated by announce handling (§4.4); not itself pruned
    /// by a timer, only reconciled against the peer table on maintenance
    /// since a node no longer in the peer table can't still be a neighbor.
    direct_neighbors: HashSet<NodeHash>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sighting of `hash` at `now`, creating the entry if new.
    /// Returns `true` if this is the first time the peer has been seen.
    pub fn observe(&mut self, hash: NodeHash, now: u64) -> bool {
        match self.peers.get_mut(&hash) {
            Some(peer) => {
                peer.mark_seen(now);
                false
            }
            None => {
                self.peers.insert(hash, Peer::new(hash, now));
                true
            }
        }
    }

    pub fn set_nickname(&mut self, hash: NodeHash, nickname: String) {
        if let Some(peer) = self.peers.get_mut(&hash) {
            peer.nickname = Some(nickname);
        }
    }

    pub fn set_friend_code(&mut self, hash: NodeHash, code: FriendCode) {
        if let Some(peer) = self.peers.get_mut(&hash) {
            peer.friend_code = Some(code);
        }
    }

    pub fn mark_relayed(&mut self, hash: NodeHash) {
        if let Some(peer) = self.peers.get_mut(&hash) {
            peer.mark_relayed();
        }
    }

    pub fn get(&self, hash: NodeHash) -> Option<&Peer> {
        self.peers.get(&hash)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// All peers currently online per `Peer::is_online` (I4).
    pub fn online_peers(&self, now: u64) -> impl Iterator<Item = &Peer> {
        self.peers.values().filter(move |p| p.is_online(now))
    }

    /// Drop peers that have been offline for longer than `retention_secs`
    /// beyond the online window, called from the maintenance tick (§4.7).
    pub fn prune_stale(&mut self, now: u64, retention_secs: u64) {
        self.peers
            .retain(|_, p| now.saturating_sub(p.last_seen) < retention_secs);
        let peers = &self.peers;
        self.direct_neighbors.retain(|hash| peers.contains_key(hash));
    }

    /// Record that `hash` was heard at hop-0 (§4.4: "insert senderHash into
    /// the direct-neighbor set").
    pub fn mark_direct_neighbor(&mut self, hash: NodeHash) {
        self.direct_neighbors.insert(hash);
    }

    /// Was `hash` ever heard directly (hop-0), and is it still in the peer
    /// table?
    pub fn is_direct_neighbor(&self, hash: NodeHash) -> bool {
        self.direct_neighbors.contains(&hash)
    }

    /// All currently-tracked direct neighbors.
    pub fn direct_neighbors(&self) -> impl Iterator<Item = &NodeHash> {
        self.direct_neighbors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_reports_first_sighting() {
        let mut table = PeerTable::new();
        assert!(table.observe(NodeHash(1), 100));
        assert!(!table.observe(NodeHash(1), 101));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn online_peers_respects_60s_window() {
        let mut table = PeerTable::new();
        table.observe(NodeHash(1), 0);
        table.observe(NodeHash(2), 50);
        let online: Vec<_> = table.online_peers(59).map(|p| p.hash).collect();
        assert_eq!(online, vec![NodeHash(2)]);
    }

    #[test]
    fn direct_neighbors_are_reconciled_on_prune() {
        let mut table = PeerTable::new();
        table.observe(NodeHash(1), 0);
        table.observe(NodeHash(2), 1000);
        table.mark_direct_neighbor(NodeHash(1));
        table.mark_direct_neighbor(NodeHash(2));

        table.prune_stale(1000, 300);

        assert!(!table.is_direct_neighbor(NodeHash(1)));
        assert!(table.is_direct_neighbor(NodeHash(2)));
    }

    #[test]
    fn prune_stale_removes_old_entries() {
        let mut table = PeerTable::new();
        table.observe(NodeHash(1), 0);
        table.observe(NodeHash(2), 1000);
        table.prune_stale(1000, 300);
        assert!(table.get(NodeHash(1)).is_none());
        assert!(table.get(NodeHash(2)).is_some());
    }
}
