//! Node identity, hashes, and friend codes.
//!
//! The mesh has no PKI: a node is just a randomly generated 32-bit id,
//! rendered as an 8-hex-character string and persisted by the embedding
//! application. Every other identifier in the protocol (`NodeHash`,
//! `FriendCode`, `MessageId`) is derived from a single 16-bit string hash
//! so two independent implementations agree on the bytes they put on air.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors constructing identity values from untrusted strings.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentityError {
    /// A `NodeId` must be exactly 8 hex characters.
    #[error("invalid node id {0:?}: expected 8 hex characters")]
    InvalidNodeId(String),

    /// A `FriendCode` must be exactly 4 uppercase hex characters.
    #[error("invalid friend code {0:?}: expected 4 uppercase hex characters")]
    InvalidFriendCode(String),
}

/// The 16-bit string hash shared by `NodeHash`, `MessageId`, and `targetHash`.
///
/// `h = ((h << 5) - h + c) & 0xFFFF`, iterated over the Unicode code points
/// of `s`. Kept as a free function (rather than a trait) because it must
/// produce byte-identical results to the reference implementation.
pub fn hash16(s: &str) -> u16 {
    let mut h: u32 = 0;
    for c in s.chars() {
        h = (h.wrapping_shl(5).wrapping_sub(h).wrapping_add(c as u32)) & 0xFFFF;
    }
    h as u16
}

/// A node's stable identifier: an 8-hex-character string, generated once
/// and persisted by the embedding application (§6.3).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Generate a new random node id.
    pub fn generate() -> Self {
        let bytes: [u8; 4] = rand::random();
        Self(hex::encode(bytes))
    }

    /// The underlying 8-hex-character string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive this node's [`NodeHash`].
    pub fn node_hash(&self) -> NodeHash {
        NodeHash(hash16(&self.0))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 8 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(IdentityError::InvalidNodeId(s.to_string()))
        }
    }
}

/// A 16-bit deterministic hash of a [`NodeId`]. Fits in two on-wire bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHash(pub u16);

impl NodeHash {
    /// Render as the 4-uppercase-hex `FriendCode` for this hash.
    pub fn friend_code(self) -> FriendCode {
        FriendCode(format!("{:04X}", self.0))
    }
}

impl fmt::Display for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

/// A 4-uppercase-hex rendering of a [`NodeHash`]; human-shareable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FriendCode(String);

impl FriendCode {
    /// Parse a `NodeHash` back out of this friend code.
    ///
    /// `hashOf(NodeId) == parseHex(FriendCode of that node)`, so this is
    /// the inverse of [`NodeHash::friend_code`] and never fails for a
    /// friend code that was itself produced by this type.
    pub fn to_node_hash(&self) -> NodeHash {
        let value = u16::from_str_radix(&self.0, 16).unwrap_or(0);
        NodeHash(value)
    }

    /// The underlying 4-uppercase-hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FriendCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FriendCode {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 4 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Self(s.to_ascii_uppercase()))
        } else {
            Err(IdentityError::InvalidFriendCode(s.to_string()))
        }
    }
}

/// A 16-bit hash of a locally generated UUID, used as the dedup key for a
/// single send (§4.2). Shares the wire-level `msgIdHash` value: the
/// reference implementation normalizes it into a string cache key
/// (`"h:" + hex`) before using it as a `Map` key; here the typed dedup
/// cache is keyed directly by the numeric value, which is equivalent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u16);

impl MessageId {
    /// Generate a new message id from a fresh random UUID-like value.
    pub fn generate() -> Self {
        let uuid = uuid_v4_string();
        Self(hash16(&uuid))
    }

    /// Build a `MessageId` from an already-known wire-level hash, e.g. one
    /// just decoded from an inbound frame.
    pub fn from_wire_hash(msg_id_hash: u16) -> Self {
        Self(msg_id_hash)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

/// A minimal RFC-4122-shaped v4 UUID string, used only as hash input for
/// [`MessageId::generate`]. Not exposed or parsed elsewhere.
fn uuid_v4_string() -> String {
    let mut bytes: [u8; 16] = rand::random();
    bytes[6] = (bytes[6] & 0x0F) | 0x40;
    bytes[8] = (bytes[8] & 0x3F) | 0x80;
    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        bytes[6], bytes[7],
        bytes[8], bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash16_is_deterministic() {
        assert_eq!(hash16("alice"), hash16("alice"));
        assert_ne!(hash16("alice"), hash16("bob"));
    }

    #[test]
    fn hash16_matches_reference_constant() {
        // h = ((h<<5) - h + c) & 0xFFFF over "ab":
        // h=0 -> c='a'(97): h=97
        // h=97 -> c='b'(98): h = (97*31 + 98) & 0xFFFF = 3105
        assert_eq!(hash16("ab"), 3105);
    }

    #[test]
    fn node_id_generate_is_8_hex_chars() {
        let id = NodeId::generate();
        assert_eq!(id.as_str().len(), 8);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn node_id_parse_rejects_bad_length() {
        assert!("abc".parse::<NodeId>().is_err());
        assert!("deadbeef".parse::<NodeId>().is_ok());
    }

    #[test]
    fn friend_code_roundtrips_through_node_hash() {
        let id: NodeId = "1a2b3c4d".parse().unwrap();
        let hash = id.node_hash();
        let code = hash.friend_code();
        assert_eq!(code.as_str().len(), 4);
        assert_eq!(code.to_node_hash(), hash);
    }

    #[test]
    fn friend_code_parse_requires_uppercase_hex_length_4() {
        assert!("12AB".parse::<FriendCode>().is_ok());
        assert!("12ab".parse::<FriendCode>().is_ok()); // normalized to uppercase
        assert!("12A".parse::<FriendCode>().is_err());
        assert!("ZZZZ".parse::<FriendCode>().is_err());
    }

    #[test]
    fn message_id_generate_is_random() {
        let a = MessageId::generate();
        let b = MessageId::generate();
        // Extremely unlikely to collide; not a correctness guarantee, just a smoke test.
        assert_ne!(a.0, 0);
        assert_ne!(b.0, 0);
    }
}
