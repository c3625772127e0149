//! Wire-level frame type codes and the decoded frame shapes (§4.1).

use serde::{Deserialize, Serialize};

use crate::identity::{MessageId, NodeHash};

/// The six wire type codes. Unknown codes fail to decode (§4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameType {
    Announce,
    FriendRequest,
    Message,
    Direct,
    Sos,
    Ack,
}

impl FrameType {
    /// The on-wire byte for this type.
    pub const fn code(self) -> u8 {
        match self {
            FrameType::Announce => 0x01,
            FrameType::FriendRequest => 0x02,
            FrameType::Message => 0x04,
            FrameType::Direct => 0x08,
            FrameType::Sos => 0x10,
            FrameType::Ack => 0x20,
        }
    }

    /// Parse a wire byte into a `FrameType`, or `None` for an unknown code.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(FrameType::Announce),
            0x02 => Some(FrameType::FriendRequest),
            0x04 => Some(FrameType::Message),
            0x08 => Some(FrameType::Direct),
            0x10 => Some(FrameType::Sos),
            0x20 => Some(FrameType::Ack),
            _ => None,
        }
    }

    /// Broadcast-shaped body (timestamp + lat/lon + text): announce, message, sos.
    /// Directed-shaped body (targetHash + timestamp + text): direct, friendRequest, ack.
    pub const fn is_broadcast_shaped(self) -> bool {
        matches!(self, FrameType::Announce | FrameType::Message | FrameType::Sos)
    }
}

/// Default time-to-live for newly originated frames.
pub const DEFAULT_TTL: u8 = 5;

/// A fully decoded wire frame, in either the broadcast or directed shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    Broadcast(BroadcastFrame),
    Directed(DirectedFrame),
}

impl Frame {
    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::Broadcast(f) => f.frame_type,
            Frame::Directed(f) => f.frame_type,
        }
    }

    pub fn ttl(&self) -> u8 {
        match self {
            Frame::Broadcast(f) => f.ttl,
            Frame::Directed(f) => f.ttl,
        }
    }

    pub fn msg_id_hash(&self) -> u16 {
        match self {
            Frame::Broadcast(f) => f.msg_id_hash,
            Frame::Directed(f) => f.msg_id_hash,
        }
    }

    pub fn message_id(&self) -> MessageId {
        MessageId::from_wire_hash(self.msg_id_hash())
    }

    pub fn sender_hash(&self) -> NodeHash {
        match self {
            Frame::Broadcast(f) => f.sender_hash,
            Frame::Directed(f) => f.sender_hash,
        }
    }

    /// Hops already traversed since origination: `5 − ttl` is only exact
    /// for a frame originated with the default TTL; the engine always
    /// computes hop count against [`DEFAULT_TTL`] per §4.4/§4.5.
    pub fn hop_count(&self) -> u8 {
        DEFAULT_TTL.saturating_sub(self.ttl())
    }

    /// Return a copy of this frame with TTL decremented by 1, for relay.
    /// `None` if the post-decrement TTL would not be > 0 (I3).
    pub fn decremented(&self) -> Option<Frame> {
        if self.ttl() == 0 {
            return None;
        }
        let mut copy = self.clone();
        match &mut copy {
            Frame::Broadcast(f) => f.ttl -= 1,
            Frame::Directed(f) => f.ttl -= 1,
        }
        Some(copy)
    }
}

/// Decoded Broadcast frame body: announce / message / sos (§4.1).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BroadcastFrame {
    pub frame_type: FrameType,
    pub ttl: u8,
    pub msg_id_hash: u16,
    pub sender_hash: NodeHash,
    pub timestamp: u32,
    /// `NaN` encodes "absent" on the wire.
    pub latitude: f32,
    /// `NaN` encodes "absent" on the wire.
    pub longitude: f32,
    pub text: Vec<u8>,
}

impl BroadcastFrame {
    pub fn latitude_value(&self) -> Option<f32> {
        (!self.latitude.is_nan()).then_some(self.latitude)
    }

    pub fn longitude_value(&self) -> Option<f32> {
        (!self.longitude.is_nan()).then_some(self.longitude)
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.text).into_owned()
    }
}

/// Decoded Directed frame body: direct / friendRequest / ack (§4.1).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectedFrame {
    pub frame_type: FrameType,
    pub ttl: u8,
    pub msg_id_hash: u16,
    pub sender_hash: NodeHash,
    pub target_hash: NodeHash,
    pub timestamp: u32,
    pub text: Vec<u8>,
}

impl DirectedFrame {
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.text).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_type_code_roundtrip() {
        for ft in [
            FrameType::Announce,
            FrameType::FriendRequest,
            FrameType::Message,
            FrameType::Direct,
            FrameType::Sos,
            FrameType::Ack,
        ] {
            assert_eq!(FrameType::from_code(ft.code()), Some(ft));
        }
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(FrameType::from_code(0x99), None);
    }

    #[test]
    fn hop_count_is_default_ttl_minus_ttl() {
        let f = Frame::Broadcast(BroadcastFrame {
            frame_type: FrameType::Message,
            ttl: 3,
            msg_id_hash: 1,
            sender_hash: NodeHash(1),
            timestamp: 0,
            latitude: f32::NAN,
            longitude: f32::NAN,
            text: vec![],
        });
        assert_eq!(f.hop_count(), 2);
    }

    #[test]
    fn decremented_stops_at_zero() {
        let f = Frame::Directed(DirectedFrame {
            frame_type: FrameType::Direct,
            ttl: 0,
            msg_id_hash: 1,
            sender_hash: NodeHash(1),
            target_hash: NodeHash(2),
            timestamp: 0,
            text: vec![],
        });
        assert!(f.decremented().is_none());
    }
}
