//! The engine's observability streams (§4.9).
//!
//! Modeled on the daemon event bus pattern of broadcasting to however many
//! subscribers are attached, dropping the payload if nobody is listening —
//! but split into one concretely-typed channel per stream instead of a
//! single JSON-erased envelope, since nothing here crosses an RPC boundary
//! that would otherwise force type erasure.

use mesh_types::{
    ErrorEvent, FriendCodeDiscovery, FriendRequestEvent, MeshMessage, PeerSeen, RawPacketDiagnostic,
    StatusEvent,
};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Owns every outbound event stream the engine publishes to.
pub struct EventBus {
    messages: broadcast::Sender<MeshMessage>,
    peers: broadcast::Sender<PeerSeen>,
    friend_codes: broadcast::Sender<FriendCodeDiscovery>,
    friend_requests: broadcast::Sender<FriendRequestEvent>,
    status: broadcast::Sender<StatusEvent>,
    errors: broadcast::Sender<ErrorEvent>,
    diagnostics: broadcast::Sender<RawPacketDiagnostic>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            messages: broadcast::channel(CHANNEL_CAPACITY).0,
            peers: broadcast::channel(CHANNEL_CAPACITY).0,
            friend_codes: broadcast::channel(CHANNEL_CAPACITY).0,
            friend_requests: broadcast::channel(CHANNEL_CAPACITY).0,
            status: broadcast::channel(CHANNEL_CAPACITY).0,
            errors: broadcast::channel(CHANNEL_CAPACITY).0,
            diagnostics: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    pub fn subscribe_messages(&self) -> broadcast::Receiver<MeshMessage> {
        self.messages.subscribe()
    }

    pub fn subscribe_peers(&self) -> broadcast::Receiver<PeerSeen> {
        self.peers.subscribe()
    }

    pub fn subscribe_friend_codes(&self) -> broadcast::Receiver<FriendCodeDiscovery> {
        self.friend_codes.subscribe()
    }

    pub fn subscribe_friend_requests(&self) -> broadcast::Receiver<FriendRequestEvent> {
        self.friend_requests.subscribe()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusEvent> {
        self.status.subscribe()
    }

    pub fn subscribe_errors(&self) -> broadcast::Receiver<ErrorEvent> {
        self.errors.subscribe()
    }

    pub fn subscribe_diagnostics(&self) -> broadcast::Receiver<RawPacketDiagnostic> {
        self.diagnostics.subscribe()
    }

    /// `broadcast::Sender::send` errors only when there are zero receivers;
    /// that's a normal, expected state here (no UI attached), so it's
    /// deliberately ignored rather than logged on every tick.
    pub fn publish_message(&self, event: MeshMessage) {
        let _ = self.messages.send(event);
    }

    pub fn publish_peer(&self, event: PeerSeen) {
        let _ = self.peers.send(event);
    }

    pub fn publish_friend_code(&self, event: FriendCodeDiscovery) {
        let _ = self.friend_codes.send(event);
    }

    pub fn publish_friend_request(&self, event: FriendRequestEvent) {
        let _ = self.friend_requests.send(event);
    }

    pub fn publish_status(&self, event: StatusEvent) {
        let _ = self.status.send(event);
    }

    pub fn publish_error(&self, event: ErrorEvent) {
        let _ = self.errors.send(event);
    }

    pub fn publish_diagnostic(&self, event: RawPacketDiagnostic) {
        let _ = self.diagnostics.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::NodeHash;

    #[tokio::test]
    async fn subscriber_receives_published_peer_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_peers();
        bus.publish_peer(PeerSeen {
            hash: NodeHash(1),
            nickname: Some("alice".to_string()),
        });
        let received = rx.recv().await.unwrap();
        assert_eq!(received.hash, NodeHash(1));
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish_status(StatusEvent("scan restarted".to_string()));
    }
}
