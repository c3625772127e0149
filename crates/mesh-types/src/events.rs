//! Payload types for the engine's observability streams (§4.9).
//!
//! Each of these is delivered on its own `tokio::sync::broadcast` channel
//! by `mesh-engine`'s `EventBus` — see that crate for the channel wiring.
//! This crate only defines the payload shapes so they can be shared with
//! a future presentation layer without pulling in `tokio`.

use serde::{Deserialize, Serialize};

use crate::identity::{FriendCode, NodeHash};

/// A peer was seen (sighted via any frame type).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeerSeen {
    pub hash: NodeHash,
    pub nickname: Option<String>,
}

/// A friend code was learned for a sender, typically via an announce (§4.4).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FriendCodeDiscovery {
    pub sender_hash: NodeHash,
    pub friend_code: FriendCode,
}

/// An inbound friend request addressed to the local node (§4.6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FriendRequestEvent {
    pub sender_hash: NodeHash,
    pub nickname: String,
    pub friend_code: FriendCode,
}

/// A human-readable status line (e.g. "scan restarted").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusEvent(pub String);

/// A human-readable error line (radio failure, permission missing, etc.).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorEvent(pub String);
