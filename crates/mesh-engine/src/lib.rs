//! # mesh-engine
//!
//! The protocol engine: peer table, duplicate suppression, controlled-flood
//! relay scheduling, anti-collision advertising, announcement cooldown,
//! directed-message targeting, and friend-request retry (§4, §5).
//!
//! Platform I/O (BLE radio, durable storage) is isolated behind the
//! [`radio::RadioPort`] and [`storage::PersistencePort`] traits (§6); this
//! crate owns none of it directly.

pub mod advertise;
pub mod announce;
pub mod config;
pub mod dedup;
pub mod directed;
pub mod engine;
pub mod error;
pub mod events;
pub mod maintenance;
pub mod message_log;
pub mod peer_table;
pub mod radio;
pub mod relay;
pub mod scan;
pub mod storage;

pub use advertise::AdvertiseSlot;
pub use config::MeshConfig;
pub use engine::{Command, MeshEngine};
pub use error::{EngineError, Result};
pub use events::EventBus;
pub use message_log::MessageLog;
pub use radio::{Advertisement, MockRadio, MockRadioCall, RadioPort};
pub use storage::{FilePersistence, MemoryPersistence, PersistencePort};
