//! Engine configuration (ambient stack, SPEC_FULL §1.1).
//!
//! Timing windows and cache caps are all spec-mandated constants, but they
//! are exposed as a loadable `MeshConfig` — not hardcoded — so a deployment
//! can tune them (e.g. a denser mesh might want a larger dedup cap) without
//! a rebuild, the way `ochra-daemon::config::DaemonConfig` externalizes
//! otherwise-constant-looking values.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub caches: CacheConfig,
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            identity: IdentityConfig::default(),
            timing: TimingConfig::default(),
            caches: CacheConfig::default(),
            advanced: AdvancedConfig::default(),
        }
    }
}

/// Display identity. The node id itself is generated once and persisted
/// externally (§6.3); only the nickname is configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_nickname")]
    pub nickname: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            nickname: default_nickname(),
        }
    }
}

fn default_nickname() -> String {
    "anonymous".to_string()
}

/// Timing windows named throughout §4.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_ttl")]
    pub default_ttl: u8,
    #[serde(default = "default_relay_tick_ms")]
    pub relay_tick_ms: u64,
    #[serde(default = "default_relay_spacing_ms")]
    pub relay_spacing_ms: u64,
    #[serde(default = "default_relay_jitter_range_ms")]
    pub relay_jitter_range_ms: (u64, u64),
    #[serde(default = "default_advertise_quiesce_ms")]
    pub advertise_quiesce_ms: u64,
    #[serde(default = "default_advertise_pre_jitter_range_ms")]
    pub advertise_pre_jitter_range_ms: (u64, u64),
    #[serde(default = "default_broadcast_window_ms")]
    pub broadcast_window_ms: u64,
    #[serde(default = "default_announce_interval_range_ms")]
    pub announce_interval_range_ms: (u64, u64),
    #[serde(default = "default_announcement_cooldown_secs")]
    pub announcement_cooldown_secs: u64,
    #[serde(default = "default_scan_window_secs")]
    pub scan_window_secs: u64,
    #[serde(default = "default_scan_restart_range_ms")]
    pub scan_restart_range_ms: (u64, u64),
    #[serde(default = "default_friend_request_retry_secs")]
    pub friend_request_retry_secs: u64,
    #[serde(default = "default_friend_request_retries")]
    pub friend_request_retries: u32,
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            relay_tick_ms: default_relay_tick_ms(),
            relay_spacing_ms: default_relay_spacing_ms(),
            relay_jitter_range_ms: default_relay_jitter_range_ms(),
            advertise_quiesce_ms: default_advertise_quiesce_ms(),
            advertise_pre_jitter_range_ms: default_advertise_pre_jitter_range_ms(),
            broadcast_window_ms: default_broadcast_window_ms(),
            announce_interval_range_ms: default_announce_interval_range_ms(),
            announcement_cooldown_secs: default_announcement_cooldown_secs(),
            scan_window_secs: default_scan_window_secs(),
            scan_restart_range_ms: default_scan_restart_range_ms(),
            friend_request_retry_secs: default_friend_request_retry_secs(),
            friend_request_retries: default_friend_request_retries(),
            maintenance_interval_secs: default_maintenance_interval_secs(),
        }
    }
}

fn default_ttl() -> u8 {
    5
}
fn default_relay_tick_ms() -> u64 {
    100
}
fn default_relay_spacing_ms() -> u64 {
    50
}
fn default_relay_jitter_range_ms() -> (u64, u64) {
    (50, 200)
}
fn default_advertise_quiesce_ms() -> u64 {
    150
}
fn default_advertise_pre_jitter_range_ms() -> (u64, u64) {
    (0, 200)
}
fn default_broadcast_window_ms() -> u64 {
    1500
}
fn default_announce_interval_range_ms() -> (u64, u64) {
    (4000, 7000)
}
fn default_announcement_cooldown_secs() -> u64 {
    3
}
fn default_scan_window_secs() -> u64 {
    10
}
fn default_scan_restart_range_ms() -> (u64, u64) {
    (500, 1000)
}
fn default_friend_request_retry_secs() -> u64 {
    3
}
fn default_friend_request_retries() -> u32 {
    5
}
fn default_maintenance_interval_secs() -> u64 {
    60
}

/// Cache size and retention caps named in §3/§4.7.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_dedup_cache_cap")]
    pub dedup_cache_cap: usize,
    #[serde(default = "default_dedup_ttl_secs")]
    pub dedup_ttl_secs: u64,
    #[serde(default = "default_relay_timestamp_ttl_secs")]
    pub relay_timestamp_ttl_secs: u64,
    #[serde(default = "default_announcement_cooldown_ttl_secs")]
    pub announcement_cooldown_ttl_secs: u64,
    #[serde(default = "default_peer_offline_secs")]
    pub peer_offline_secs: u64,
    #[serde(default = "default_message_log_ttl_secs")]
    pub message_log_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dedup_cache_cap: default_dedup_cache_cap(),
            dedup_ttl_secs: default_dedup_ttl_secs(),
            relay_timestamp_ttl_secs: default_relay_timestamp_ttl_secs(),
            announcement_cooldown_ttl_secs: default_announcement_cooldown_ttl_secs(),
            peer_offline_secs: default_peer_offline_secs(),
            message_log_ttl_secs: default_message_log_ttl_secs(),
        }
    }
}

fn default_dedup_cache_cap() -> usize {
    1000
}
fn default_dedup_ttl_secs() -> u64 {
    300
}
fn default_relay_timestamp_ttl_secs() -> u64 {
    300
}
fn default_announcement_cooldown_ttl_secs() -> u64 {
    120
}
fn default_peer_offline_secs() -> u64 {
    60
}
fn default_message_log_ttl_secs() -> u64 {
    300
}

/// Non-protocol knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file: String,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: String::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl MeshConfig {
    /// Load configuration from the default config file location, falling
    /// back to defaults if it does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    fn config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("MESH_DATA_DIR") {
            return PathBuf::from(dir).join("config.toml");
        }
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory, used by `mesh-node` for
    /// the persisted node id (§6.3) and config file.
    pub fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("MESH_DATA_DIR") {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".mesh"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/mesh"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let config = MeshConfig::default();
        assert_eq!(config.timing.default_ttl, 5);
        assert_eq!(config.timing.relay_tick_ms, 100);
        assert_eq!(config.timing.relay_spacing_ms, 50);
        assert_eq!(config.timing.advertise_quiesce_ms, 150);
        assert_eq!(config.timing.broadcast_window_ms, 1500);
        assert_eq!(config.timing.announcement_cooldown_secs, 3);
        assert_eq!(config.timing.friend_request_retries, 5);
        assert_eq!(config.caches.dedup_cache_cap, 1000);
        assert_eq!(config.caches.peer_offline_secs, 60);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = MeshConfig::default();
        let text = toml::to_string(&config).expect("serialize");
        let parsed: MeshConfig = toml::from_str(&text).expect("parse");
        assert_eq!(parsed.timing.default_ttl, config.timing.default_ttl);
    }
}
