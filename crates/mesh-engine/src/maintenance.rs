//! Periodic housekeeping: prunes the peer table and reconciles the relay
//! tracker against the dedup cache (§4.7).
//!
//! Nothing here is on the hot path of a single frame; it runs on its own
//! slow tick (`maintenance_interval_secs`, default 60s) so caches that grow
//! one entry per frame don't grow forever over a long-running node.

use std::collections::HashMap;

use mesh_types::NodeHash;
use tracing::debug;

use crate::dedup::DedupCache;
use crate::message_log::MessageLog;
use crate::peer_table::PeerTable;
use crate::relay::RelayTracker;

/// Run one maintenance pass: prune offline peers, drop relay-tracker
/// entries for message ids the dedup cache no longer remembers or that have
/// simply outlived their own retention window, drop announce-cooldown
/// entries for peers that were just pruned or that have outlived their own
/// cooldown TTL, and evict message-log entries older than their TTL (§4.7).
#[allow(clippy::too_many_arguments)]
pub fn run_once(
    peers: &mut PeerTable,
    dedup: &DedupCache,
    relay_tracker: &mut RelayTracker,
    announce_cooldown: &mut HashMap<NodeHash, u64>,
    message_log: &mut MessageLog,
    now: u64,
    peer_retention_secs: u64,
    relay_timestamp_ttl_secs: u64,
    announcement_cooldown_ttl_secs: u64,
) {
    let before = peers.len();
    peers.prune_stale(now, peer_retention_secs);
    let pruned = before - peers.len();

    let before = relay_tracker.len();
    relay_tracker.retain_known(|id| dedup.contains(*id));
    relay_tracker.prune_expired(now, relay_timestamp_ttl_secs);
    let reconciled = before - relay_tracker.len();

    // A cooldown entry is evicted either because its peer fell out of the
    // peer table, or simply because it is older than its own TTL (§4.7:
    // "evict AnnouncementCooldown older than 2 minutes") — a peer can stay
    // online while its last announce ages out of the cooldown window.
    announce_cooldown.retain(|hash, &mut last| {
        peers.get(*hash).is_some() && now.saturating_sub(last) < announcement_cooldown_ttl_secs
    });

    let before = message_log.len();
    message_log.prune(now);
    let evicted = before - message_log.len();

    debug!(
        pruned_peers = pruned,
        reconciled_relay_entries = reconciled,
        evicted_messages = evicted,
        "maintenance pass complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::{FrameType, MessageId, NodeHash, Priority};

    fn sample_message(id: u16) -> mesh_types::MeshMessage {
        mesh_types::MeshMessage {
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
    fn prunes_stale_peers_and_orphaned_relay_entries() {
        let mut peers = PeerTable::new();
        peers.observe(NodeHash(1), 0);
        peers.observe(NodeHash(2), 1000);

        let mut dedup = DedupCache::new(100, 300);
        dedup.check_and_insert(MessageId(1), 1000);

        let mut relay_tracker = RelayTracker::new();
        relay_tracker.should_relay(MessageId(1), 4, 0, 50, 0);
        relay_tracker.should_relay(MessageId(2), 4, 0, 50, 0);

        let mut announce_cooldown = HashMap::new();
        announce_cooldown.insert(NodeHash(1), 0);
        announce_cooldown.insert(NodeHash(2), 1000);

        let mut message_log = MessageLog::new(300);
        message_log.push(sample_message(1), 0);
        message_log.push(sample_message(2), 1000);

        run_once(
            &mut peers,
            &dedup,
            &mut relay_tracker,
            &mut announce_cooldown,
            &mut message_log,
            1000,
            300,
            300,
            120,
        );

        assert!(peers.get(NodeHash(1)).is_none());
        assert!(peers.get(NodeHash(2)).is_some());
        assert_eq!(relay_tracker.len(), 1);
        assert_eq!(announce_cooldown.len(), 1);
        assert!(announce_cooldown.contains_key(&NodeHash(2)));
        assert_eq!(message_log.len(), 1);
    }

    #[test]
    fn announce_cooldown_entry_expires_even_for_a_still_online_peer() {
        let mut peers = PeerTable::new();
        peers.observe(NodeHash(1), 1000);

        let dedup = DedupCache::new(100, 300);
        let mut relay_tracker = RelayTracker::new();
        let mut announce_cooldown = HashMap::new();
        announce_cooldown.insert(NodeHash(1), 0);
        let mut message_log = MessageLog::new(300);

        run_once(&mut peers, &dedup, &mut relay_tracker, &mut announce_cooldown, &mut message_log, 1000, 300, 300, 120);

        assert!(peers.get(NodeHash(1)).is_some(), "peer is still online");
        assert!(announce_cooldown.is_empty(), "cooldown entry older than its own TTL must expire regardless");
    }
}
