//! Classified, deliverable mesh messages (§3, §4.5, §4.6).

use serde::{Deserialize, Serialize};

use crate::frame::FrameType;
use crate::identity::{FriendCode, MessageId, NodeHash};

/// Classification flag distinguishing SOS from ordinary chat traffic.
/// Not a wire field — a presentation layer can branch on it without
/// string-matching the frame type (SPEC_FULL §4.5).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Normal,
    Urgent,
}

/// A classified frame ready for delivery to local subscribers (I1: at most
/// once per [`MessageId`]).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeshMessage {
    pub id: MessageId,
    pub frame_type: FrameType,
    pub sender_hash: NodeHash,
    pub nickname: Option<String>,
    pub timestamp: u32,
    pub content: String,
    pub hop_count: u8,
    pub was_relayed: bool,
    pub priority: Priority,
    pub latitude: Option<f32>,
    pub longitude: Option<f32>,
    /// Present only for directed frames delivered to the local user.
    pub target_friend_code: Option<FriendCode>,
}
