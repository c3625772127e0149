//! # mesh-types
//!
//! Shared data model for the opportunistic BLE mesh messaging engine: node
//! identity and hashing, wire frame shapes, peer table entries, classified
//! messages, and event stream payloads.
//!
//! This crate has no async runtime or I/O dependency, the way `ochra-types`
//! is the dependency-free leaf every other `ochra-*` crate builds on: both
//! `mesh-codec` and `mesh-engine` depend on it, never the reverse.

pub mod diagnostics;
pub mod events;
pub mod frame;
pub mod identity;
pub mod message;
pub mod peer;

pub use diagnostics::{CodecError, RawPacketDiagnostic};
pub use events::{ErrorEvent, FriendCodeDiscovery, FriendRequestEvent, PeerSeen, StatusEvent};
pub use frame::{BroadcastFrame, DirectedFrame, Frame, FrameType, DEFAULT_TTL};
pub use identity::{hash16, FriendCode, IdentityError, MessageId, NodeHash, NodeId};
pub use message::{MeshMessage, Priority};
pub use peer::Peer;
