//! Raw-packet diagnostic records (§4.9) — emitted for every received frame,
//! including ones that are ultimately dropped, so an observability layer
//! can account for every byte the radio handed up.

use serde::{Deserialize, Serialize};

/// A decode failure, carried alongside a best-effort frame where possible
/// (§4.1: "decode always attempts to produce a best-effort frame plus a
/// diagnostic record").
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum CodecError {
    #[error("frame too short")]
    TooShort,
    #[error("unknown frame type code")]
    UnknownType,
    #[error("malformed utf-8 in text field")]
    MalformedUtf8,
}

/// One diagnostic record per frame handed up from the radio.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawPacketDiagnostic {
    /// Hex-encoded manufacturer-data payload as received.
    pub hex: String,
    /// Parsed type code, if the header was at least long enough to read it.
    pub parsed_type: Option<u8>,
    pub parsed_ttl: Option<u8>,
    pub parsed_msg_id_hash: Option<u16>,
    pub parsed_sender_hash: Option<u16>,
    pub is_duplicate: bool,
    pub is_from_self: bool,
    pub decode_error: Option<CodecError>,
}
