//! # mesh-codec
//!
//! Wire encoding for the two mesh frame shapes (§4.1).
//!
//! ## Wire format
//!
//! ```text
//! Common prefix (6 bytes):
//!   type:u8  ttl:u8  msgIdHash:u16(BE)  senderHash:u16(BE)
//!
//! Broadcast body (+12 bytes header + up to 9 bytes text):
//!   timestamp:u32(BE)  latitude:f32(BE, NaN=absent)  longitude:f32(BE, NaN=absent)  text
//!
//! Directed body (+6 bytes header + up to 17 bytes text, see `max_directed_text_len`):
//!   targetHash:u16(BE)  timestamp:u32(BE)  text
//! ```
//!
//! Manufacturer id is `0x8888` (§6.2); this crate does not touch the BLE
//! advertising PDU itself, only the manufacturer-data payload bytes inside
//! it — the radio collaborator (§6.1) owns the PDU.

use mesh_types::{
    BroadcastFrame, CodecError, DirectedFrame, Frame, FrameType, NodeHash, DEFAULT_TTL,
};

/// Manufacturer id the scan loop filters on (§6.2, §4.8).
pub const MANUFACTURER_ID: u16 = 0x8888;

/// Hard ceiling on the manufacturer-data payload (§4.1, §6.1).
pub const MAX_PAYLOAD_LEN: usize = 27;

/// Per-field truncation limit for broadcast text (§4.1).
pub const BROADCAST_TEXT_MAX: usize = 9;

/// Per-field truncation limit for directed text (§4.1).
pub const DIRECTED_TEXT_MAX: usize = 17;

const COMMON_PREFIX_LEN: usize = 6;
const BROADCAST_HEADER_LEN: usize = 12;
const DIRECTED_HEADER_LEN: usize = 6;

/// Smallest frame the codec will attempt to decode: the common prefix plus
/// an empty-text directed header. Anything shorter is [`CodecError::TooShort`].
const MIN_FRAME_LEN: usize = COMMON_PREFIX_LEN + DIRECTED_HEADER_LEN;

/// The directed text cap (17, §4.1) and the overall 27-byte payload cap
/// cannot both hold at once for a maximal directed frame (12 + 17 = 29).
/// This implementation treats the 27-byte ceiling as authoritative — it is
/// the one callers (§6.1) must never exceed on real hardware — and derives
/// the *effective* directed text cap from it, never exceeding
/// [`DIRECTED_TEXT_MAX`] either. See DESIGN.md for the recorded decision.
pub fn max_directed_text_len() -> usize {
    (MAX_PAYLOAD_LEN - COMMON_PREFIX_LEN - DIRECTED_HEADER_LEN).min(DIRECTED_TEXT_MAX)
}

fn max_broadcast_text_len() -> usize {
    (MAX_PAYLOAD_LEN - COMMON_PREFIX_LEN - BROADCAST_HEADER_LEN).min(BROADCAST_TEXT_MAX)
}

/// Encode a frame to its manufacturer-data bytes.
///
/// Text is truncated silently (§4.1). Deterministic given the frame's
/// fields (P9).
pub fn encode(frame: &Frame) -> Vec<u8> {
    match frame {
        Frame::Broadcast(f) => encode_broadcast(f),
        Frame::Directed(f) => encode_directed(f),
    }
}

fn encode_broadcast(f: &BroadcastFrame) -> Vec<u8> {
    let text_len = f.text.len().min(max_broadcast_text_len());
    let mut out = Vec::with_capacity(COMMON_PREFIX_LEN + BROADCAST_HEADER_LEN + text_len);
    out.push(f.frame_type.code());
    out.push(f.ttl);
    out.extend_from_slice(&f.msg_id_hash.to_be_bytes());
    out.extend_from_slice(&f.sender_hash.0.to_be_bytes());
    out.extend_from_slice(&f.timestamp.to_be_bytes());
    out.extend_from_slice(&f.latitude.to_be_bytes());
    out.extend_from_slice(&f.longitude.to_be_bytes());
    out.extend_from_slice(&f.text[..text_len]);
    out
}

fn encode_directed(f: &DirectedFrame) -> Vec<u8> {
    let text_len = f.text.len().min(max_directed_text_len());
    let mut out = Vec::with_capacity(COMMON_PREFIX_LEN + DIRECTED_HEADER_LEN + text_len);
    out.push(f.frame_type.code());
    out.push(f.ttl);
    out.extend_from_slice(&f.msg_id_hash.to_be_bytes());
    out.extend_from_slice(&f.sender_hash.0.to_be_bytes());
    out.extend_from_slice(&f.target_hash.0.to_be_bytes());
    out.extend_from_slice(&f.timestamp.to_be_bytes());
    out.extend_from_slice(&f.text[..text_len]);
    out
}

/// The result of attempting to decode a manufacturer-data payload.
///
/// Decode always attempts a best-effort frame, per §4.1: a successfully
/// classified header with an oversized/undersized body still yields the
/// fields the header carries, so the diagnostic stream (§4.9) has
/// something to show even for a dropped frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOutcome {
    pub frame: Option<Frame>,
    pub parsed_type: Option<u8>,
    pub parsed_ttl: Option<u8>,
    pub parsed_msg_id_hash: Option<u16>,
    pub parsed_sender_hash: Option<u16>,
    pub error: Option<CodecError>,
}

/// Decode manufacturer-data bytes into a frame, or a diagnostic-only
/// outcome on failure (§4.1).
pub fn decode(bytes: &[u8]) -> DecodeOutcome {
    if bytes.len() < MIN_FRAME_LEN {
        return DecodeOutcome {
            frame: None,
            parsed_type: bytes.first().copied(),
            parsed_ttl: bytes.get(1).copied(),
            parsed_msg_id_hash: None,
            parsed_sender_hash: None,
            error: Some(CodecError::TooShort),
        };
    }

    let type_code = bytes[0];
    let ttl = bytes[1];
    let msg_id_hash = u16::from_be_bytes([bytes[2], bytes[3]]);
    let sender_hash = u16::from_be_bytes([bytes[4], bytes[5]]);

    let Some(frame_type) = FrameType::from_code(type_code) else {
        return DecodeOutcome {
            frame: None,
            parsed_type: Some(type_code),
            parsed_ttl: Some(ttl),
            parsed_msg_id_hash: Some(msg_id_hash),
            parsed_sender_hash: Some(sender_hash),
            error: Some(CodecError::UnknownType),
        };
    };

    let body = &bytes[COMMON_PREFIX_LEN..];
    let (result, utf8_error) = if frame_type.is_broadcast_shaped() {
        decode_broadcast_body(frame_type, ttl, msg_id_hash, sender_hash, body)
    } else {
        decode_directed_body(frame_type, ttl, msg_id_hash, sender_hash, body)
    };

    match result {
        Ok(frame) => DecodeOutcome {
            frame: Some(frame),
            parsed_type: Some(type_code),
            parsed_ttl: Some(ttl),
            parsed_msg_id_hash: Some(msg_id_hash),
            parsed_sender_hash: Some(sender_hash),
            error: utf8_error,
        },
        Err(e) => DecodeOutcome {
            frame: None,
            parsed_type: Some(type_code),
            parsed_ttl: Some(ttl),
            parsed_msg_id_hash: Some(msg_id_hash),
            parsed_sender_hash: Some(sender_hash),
            error: Some(e),
        },
    }
}

fn decode_broadcast_body(
    frame_type: FrameType,
    ttl: u8,
    msg_id_hash: u16,
    sender_hash: u16,
    body: &[u8],
) -> (Result<Frame, CodecError>, Option<CodecError>) {
    if body.len() < BROADCAST_HEADER_LEN {
        return (Err(CodecError::TooShort), None);
    }
    let timestamp = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
    let latitude = f32::from_be_bytes([body[4], body[5], body[6], body[7]]);
    let longitude = f32::from_be_bytes([body[8], body[9], body[10], body[11]]);
    let text = body[BROADCAST_HEADER_LEN..].to_vec();
    let utf8_error = (!text.is_empty() && std::str::from_utf8(&text).is_err())
        .then_some(CodecError::MalformedUtf8);

    (
        Ok(Frame::Broadcast(BroadcastFrame {
            frame_type,
            ttl,
            msg_id_hash,
            sender_hash: NodeHash(sender_hash),
            timestamp,
            latitude,
            longitude,
            text,
        })),
        utf8_error,
    )
}

fn decode_directed_body(
    frame_type: FrameType,
    ttl: u8,
    msg_id_hash: u16,
    sender_hash: u16,
    body: &[u8],
) -> (Result<Frame, CodecError>, Option<CodecError>) {
    if body.len() < DIRECTED_HEADER_LEN {
        return (Err(CodecError::TooShort), None);
    }
    let target_hash = u16::from_be_bytes([body[0], body[1]]);
    let timestamp = u32::from_be_bytes([body[2], body[3], body[4], body[5]]);
    let text = body[DIRECTED_HEADER_LEN..].to_vec();
    let utf8_error = (!text.is_empty() && std::str::from_utf8(&text).is_err())
        .then_some(CodecError::MalformedUtf8);

    (
        Ok(Frame::Directed(DirectedFrame {
            frame_type,
            ttl,
            msg_id_hash,
            sender_hash: NodeHash(sender_hash),
            target_hash: NodeHash(target_hash),
            timestamp,
            text,
        })),
        utf8_error,
    )
}

/// Build an announce/friendRequest text payload: `"<name>|<friend_code>"`.
pub fn format_announce_text(nickname: &str, friend_code: &str) -> Vec<u8> {
    format!("{nickname}|{friend_code}").into_bytes()
}

/// Parse an announce/friendRequest text payload, tolerating the legacy
/// friend-code-absent form (§4.1).
pub fn parse_pipe_delimited(text: &[u8]) -> (String, Option<String>) {
    let s = String::from_utf8_lossy(text);
    match s.split_once('|') {
        Some((nickname, code)) => (nickname.to_string(), Some(code.to_string())),
        None => (s.into_owned(), None),
    }
}

/// Default TTL for newly originated frames (§4.1).
pub const fn default_ttl() -> u8 {
    DEFAULT_TTL
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_types::DEFAULT_TTL;

    fn sample_broadcast(text: &[u8]) -> Frame {
        Frame::Broadcast(BroadcastFrame {
            frame_type: FrameType::Message,
            ttl: DEFAULT_TTL,
            msg_id_hash: 0x1234,
            sender_hash: NodeHash(0x5678),
            timestamp: 1_700_000_000,
            latitude: f32::NAN,
            longitude: f32::NAN,
            text: text.to_vec(),
        })
    }

    fn sample_directed(text: &[u8]) -> Frame {
        Frame::Directed(DirectedFrame {
            frame_type: FrameType::Direct,
            ttl: DEFAULT_TTL,
            msg_id_hash: 0xBEEF,
            sender_hash: NodeHash(0x1234),
            target_hash: NodeHash(0x5678),
            timestamp: 1_700_000_000,
            text: text.to_vec(),
        })
    }

    #[test]
    fn broadcast_round_trips() {
        let frame = sample_broadcast(b"hi");
        let bytes = encode(&frame);
        let outcome = decode(&bytes);
        assert_eq!(outcome.frame, Some(frame));
        assert!(outcome.error.is_none());
    }

    #[test]
    fn directed_round_trips() {
        let frame = sample_directed(b"hello");
        let bytes = encode(&frame);
        let outcome = decode(&bytes);
        assert_eq!(outcome.frame, Some(frame));
    }

    #[test]
    fn broadcast_text_truncated_to_9_bytes() {
        let frame = sample_broadcast(b"0123456789ABCDEF");
        let bytes = encode(&frame);
        assert_eq!(bytes.len(), 6 + 12 + BROADCAST_TEXT_MAX);
        let outcome = decode(&bytes);
        let Some(Frame::Broadcast(b)) = outcome.frame else {
            panic!("expected broadcast frame");
        };
        assert_eq!(b.text.len(), BROADCAST_TEXT_MAX);
    }

    #[test]
    fn directed_text_truncated_to_fit_27_byte_cap() {
        let frame = sample_directed(&[b'x'; 64]);
        let bytes = encode(&frame);
        assert!(bytes.len() <= MAX_PAYLOAD_LEN);
        assert_eq!(bytes.len(), MAX_PAYLOAD_LEN);
    }

    #[test]
    fn too_short_below_minimum_frame_len() {
        let outcome = decode(&[0x04, 0x05, 0x00, 0x01]);
        assert_eq!(outcome.error, Some(CodecError::TooShort));
        assert!(outcome.frame.is_none());
    }

    #[test]
    fn unknown_type_code_fails() {
        let mut bytes = encode(&sample_directed(b"x"));
        bytes[0] = 0x99;
        let outcome = decode(&bytes);
        assert_eq!(outcome.error, Some(CodecError::UnknownType));
        assert_eq!(outcome.parsed_ttl, Some(DEFAULT_TTL));
    }

    #[test]
    fn ack_type_decodes_as_directed_shaped() {
        let mut frame = sample_directed(b"ack-payload");
        if let Frame::Directed(ref mut d) = frame {
            d.frame_type = FrameType::Ack;
        }
        let bytes = encode(&frame);
        let outcome = decode(&bytes);
        assert_eq!(outcome.frame, Some(frame));
    }

    #[test]
    fn encoding_is_deterministic() {
        let a = encode(&sample_broadcast(b"hi"));
        let b = encode(&sample_broadcast(b"hi"));
        assert_eq!(a, b);
    }

    #[test]
    fn nan_latlon_means_absent() {
        let frame = sample_broadcast(b"hi");
        let bytes = encode(&frame);
        let outcome = decode(&bytes);
        let Some(Frame::Broadcast(b)) = outcome.frame else {
            panic!("expected broadcast");
        };
        assert_eq!(b.latitude_value(), None);
        assert_eq!(b.longitude_value(), None);
    }

    #[test]
    fn present_latlon_round_trips() {
        let mut frame = sample_broadcast(b"hi");
        if let Frame::Broadcast(ref mut f) = frame {
            f.latitude = 37.7749;
            f.longitude = -122.4194;
        }
        let bytes = encode(&frame);
        let outcome = decode(&bytes);
        let Some(Frame::Broadcast(b)) = outcome.frame else {
            panic!("expected broadcast");
        };
        assert_eq!(b.latitude_value(), Some(37.7749));
        assert_eq!(b.longitude_value(), Some(-122.4194));
    }

    #[test]
    fn announce_text_format_and_parse() {
        let text = format_announce_text("alice", "1234");
        assert_eq!(parse_pipe_delimited(&text), ("alice".to_string(), Some("1234".to_string())));
    }

    #[test]
    fn legacy_announce_without_friend_code() {
        assert_eq!(parse_pipe_delimited(b"alice"), ("alice".to_string(), None));
    }
}
