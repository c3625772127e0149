//! The engine proper: wires the peer table, dedup cache, relay scheduler,
//! advertising slot, announcer, and friend-request tracker into a single
//! actor task (SPEC_FULL §5).
//!
//! All mutable protocol state lives behind one task, not one mutex per
//! field: inbound frames, outbound commands, and timer ticks all funnel
//! through a single `tokio::select!` loop, so there is never a question of
//! which lock order is safe. Sending an advertisement is the one thing
//! allowed to run concurrently with the next loop iteration — it is
//! spawned onto its own task against a cloned `Arc<AdvertiseSlot<_>>` so a
//! slow radio doesn't stall frame processing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use mesh_types::{
    BroadcastFrame, DirectedFrame, FrameType, MeshMessage, NodeHash, NodeId, Priority,
    RawPacketDiagnostic,
};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, Instant};
use tracing::{info, warn};

use crate::announce::AnnounceScheduler;
use crate::config::MeshConfig;
use crate::dedup::DedupCache;
use crate::directed::{build_directed_frame, is_addressed_to, FriendRequestTracker};
use crate::events::EventBus;
use crate::message_log::MessageLog;
use crate::peer_table::PeerTable;
use crate::radio::RadioPort;
use crate::relay::{RelayQueue, RelayTracker};
use crate::AdvertiseSlot;

/// Commands accepted from the embedding application (§2.1, the `mesh-node`
/// binary's command handling).
#[derive(Debug)]
pub enum Command {
    SendBroadcast { text: String },
    SendDirect { target: NodeHash, text: String },
    SendSos { text: String, latitude: Option<f32>, longitude: Option<f32> },
    SendFriendRequest { target: NodeHash },
    Status,
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn now_unix_u32() -> u32 {
    now_unix_secs() as u32
}

/// The running protocol engine. Construct with [`MeshEngine::new`], then
/// drive it with [`MeshEngine::run`].
pub struct MeshEngine<R: RadioPort> {
    node_id: NodeId,
    local_hash: NodeHash,
    nickname: String,
    config: MeshConfig,
    radio: Arc<R>,
    advertise_slot: Arc<AdvertiseSlot<R>>,
    events: Arc<EventBus>,
    inbound_rx: mpsc::Receiver<Vec<u8>>,
    command_rx: mpsc::Receiver<Command>,

    peers: PeerTable,
    dedup: DedupCache,
    relay_tracker: RelayTracker,
    relay_queue: RelayQueue,
    friend_requests: FriendRequestTracker,
    announce_scheduler: AnnounceScheduler,
    /// Bounded replay log of classified messages (§3/§4.5/§4.7), separate
    /// from `events`'s live-subscriber-only broadcast streams.
    message_log: MessageLog,
    /// Per-sender last-accepted-announce timestamp (§4.4/P5/GLOSSARY:
    /// "Announcement cooldown"). A second announce from the same sender
    /// inside `announcement_cooldown_secs` does not update the peer table.
    announce_cooldown: HashMap<NodeHash, u64>,
    /// Anchor for the relative millisecond clock used by the relay queue,
    /// announce scheduler, and friend-request retry timer. `Instant::now()`
    /// has no fixed epoch, so every "now in ms" reading in this module is
    /// `start.elapsed()`, not a fresh `Instant::now().elapsed()` (which
    /// would always read ~0).
    start: Instant,
}

impl<R: RadioPort + 'static> MeshEngine<R> {
    pub fn new(
        node_id: NodeId,
        nickname: String,
        config: MeshConfig,
        radio: Arc<R>,
        inbound_rx: mpsc::Receiver<Vec<u8>>,
        command_rx: mpsc::Receiver<Command>,
    ) -> Self {
        let local_hash = node_id.node_hash();
        let advertise_slot = Arc::new(AdvertiseSlot::new(
            radio.clone(),
            config.timing.advertise_pre_jitter_range_ms,
            config.timing.broadcast_window_ms,
            config.timing.advertise_quiesce_ms,
        ));
        let dedup = DedupCache::new(config.caches.dedup_cache_cap, config.caches.dedup_ttl_secs);
        let relay_queue = RelayQueue::new(config.timing.relay_spacing_ms, config.timing.relay_jitter_range_ms);
        let friend_requests = FriendRequestTracker::new(
            config.timing.friend_request_retry_secs * 1000,
            config.timing.friend_request_retries,
        );
        let announce_scheduler = AnnounceScheduler::new(config.timing.announce_interval_range_ms, 0);
        let message_log = MessageLog::new(config.caches.message_log_ttl_secs);

        Self {
            node_id,
            local_hash,
            nickname,
            config,
            radio,
            advertise_slot,
            events: Arc::new(EventBus::new()),
            inbound_rx,
            command_rx,
            peers: PeerTable::new(),
            dedup,
            relay_tracker: RelayTracker::new(),
            relay_queue,
            friend_requests,
            announce_scheduler,
            message_log,
            announce_cooldown: HashMap::new(),
            start: Instant::now(),
        }
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn local_hash(&self) -> NodeHash {
        self.local_hash
    }

    /// Drive the engine until `command_rx` is closed. Spawns its own scan
    /// loop and runs the relay/announce/maintenance ticks inline.
    pub async fn run(mut self) {
        let scan_radio = self.radio.clone();
        let scan_window = self.config.timing.scan_window_secs;
        let scan_restart_range = self.config.timing.scan_restart_range_ms;
        tokio::spawn(async move {
            crate::scan::run_scan_loop(scan_radio, scan_window, scan_restart_range).await;
        });

        let mut relay_tick = interval(Duration::from_millis(self.config.timing.relay_tick_ms));
        let mut maintenance_tick = interval(Duration::from_secs(self.config.timing.maintenance_interval_secs));
        let mut announce_tick = interval(Duration::from_millis(500));

        loop {
            tokio::select! {
                Some(bytes) = self.inbound_rx.recv() => {
                    self.handle_inbound(bytes).await;
                }
                Some(cmd) = self.command_rx.recv() => {
                    self.handle_command(cmd).await;
                }
                _ = relay_tick.tick() => {
                    self.drain_relay_queue().await;
                    self.retry_friend_requests().await;
                }
                _ = maintenance_tick.tick() => {
                    crate::maintenance::run_once(
                        &mut self.peers,
                        &self.dedup,
                        &mut self.relay_tracker,
                        &mut self.announce_cooldown,
                        &mut self.message_log,
                        now_unix_secs(),
                        self.config.caches.peer_offline_secs,
                        self.config.caches.relay_timestamp_ttl_secs,
                        self.config.caches.announcement_cooldown_ttl_secs,
                    );
                }
                _ = announce_tick.tick() => {
                    self.maybe_announce().await;
                }
                else => break,
            }
        }
    }

    async fn handle_inbound(&mut self, bytes: Vec<u8>) {
        let outcome = mesh_codec::decode(&bytes);
        let is_from_self = outcome
            .parsed_sender_hash
            .map(|h| h == self.local_hash.0)
            .unwrap_or(false);

        let Some(frame) = outcome.frame.clone() else {
            self.publish_diagnostic(&bytes, &outcome, false, is_from_self);
            return;
        };

        if is_from_self {
            self.publish_diagnostic(&bytes, &outcome, false, true);
            return;
        }

        let message_id = frame.message_id();
        let is_duplicate = self.dedup.check_and_insert(message_id, now_unix_secs());
        self.publish_diagnostic(&bytes, &outcome, is_duplicate, false);
        if is_duplicate {
            self.maybe_relay(&frame);
            return;
        }

        self.peers.observe(frame.sender_hash(), now_unix_secs());
        self.events.publish_peer(mesh_types::PeerSeen {
            hash: frame.sender_hash(),
            nickname: self.peers.get(frame.sender_hash()).and_then(|p| p.nickname.clone()),
        });

        // Directed frames always relay while ttl > 0 regardless of
        // targeting (§4.6); a broadcast can be dropped entirely by the
        // announce-cooldown gate below, in which case it must not relay
        // either (§4.4: "drop the frame entirely — no peer update, no
        // relay").
        let should_relay = match &frame {
            mesh_types::Frame::Broadcast(b) => self.handle_broadcast(b),
            mesh_types::Frame::Directed(d) => {
                self.handle_directed(d);
                true
            }
        };

        if should_relay {
            self.maybe_relay(&frame);
        }
    }

    fn publish_diagnostic(
        &self,
        bytes: &[u8],
        outcome: &mesh_codec::DecodeOutcome,
        is_duplicate: bool,
        is_from_self: bool,
    ) {
        self.events.publish_diagnostic(RawPacketDiagnostic {
            hex: hex::encode(bytes),
            parsed_type: outcome.parsed_type,
            parsed_ttl: outcome.parsed_ttl,
            parsed_msg_id_hash: outcome.parsed_msg_id_hash,
            parsed_sender_hash: outcome.parsed_sender_hash,
            is_duplicate,
            is_from_self,
            decode_error: outcome.error,
        });
    }

    /// Classify an inbound broadcast frame. Returns whether the frame should
    /// still be considered for relay afterward — `false` only for an
    /// announce suppressed by its sender's cooldown, which §4.4 says must be
    /// dropped entirely (no peer update, no relay), not merely skip the
    /// peer-table update.
    fn handle_broadcast(&mut self, frame: &BroadcastFrame) -> bool {
        match frame.frame_type {
            FrameType::Announce => {
                let frame_hop_count = mesh_types::Frame::Broadcast(frame.clone()).hop_count();
                if frame_hop_count == 0 {
                    self.peers.mark_direct_neighbor(frame.sender_hash);
                }

                let now = now_unix_secs();
                let cooldown = self.config.timing.announcement_cooldown_secs;
                if let Some(&last) = self.announce_cooldown.get(&frame.sender_hash) {
                    if now.saturating_sub(last) < cooldown {
                        return false;
                    }
                }
                self.announce_cooldown.insert(frame.sender_hash, now);

                let (nickname, code) = mesh_codec::parse_pipe_delimited(&frame.text);
                self.peers.set_nickname(frame.sender_hash, nickname);
                if let Some(code) = code {
                    if let Ok(friend_code) = code.parse::<mesh_types::FriendCode>() {
                        self.peers.set_friend_code(frame.sender_hash, friend_code.clone());
                        self.events.publish_friend_code(mesh_types::FriendCodeDiscovery {
                            sender_hash: frame.sender_hash,
                            friend_code,
                        });
                    }
                }
                true
            }
            FrameType::Message | FrameType::Sos => {
                let priority = if frame.frame_type == FrameType::Sos {
                    Priority::Urgent
                } else {
                    Priority::Normal
                };
                let nickname = self.peers.get(frame.sender_hash).and_then(|p| p.nickname.clone());
                let message = MeshMessage {
                    id: mesh_types::MessageId::from_wire_hash(frame.msg_id_hash),
                    frame_type: frame.frame_type,
                    sender_hash: frame.sender_hash,
                    nickname,
                    timestamp: frame.timestamp,
                    content: frame.text_lossy(),
                    hop_count: mesh_types::Frame::Broadcast(frame.clone()).hop_count(),
                    was_relayed: frame.ttl < mesh_types::DEFAULT_TTL,
                    priority,
                    latitude: frame.latitude_value(),
                    longitude: frame.longitude_value(),
                    target_friend_code: None,
                };
                self.message_log.push(message.clone(), now_unix_secs());
                self.events.publish_message(message);
                true
            }
            _ => unreachable!("broadcast-shaped frame types are Announce | Message | Sos"),
        }
    }

    fn handle_directed(&mut self, frame: &DirectedFrame) {
        if !is_addressed_to(frame, self.local_hash) {
            return;
        }
        match frame.frame_type {
            FrameType::FriendRequest => {
                let (nickname, code) = mesh_codec::parse_pipe_delimited(&frame.text);
                if let Some(code) = code.and_then(|c| c.parse::<mesh_types::FriendCode>().ok()) {
                    // Mutual-add shortcut (§4.6): a friend request received
                    // from X cancels any of our own pending outbound
                    // requests to X — X's friendCode hashes back to the
                    // same NodeHash the pending map is keyed by.
                    self.friend_requests.cancel(frame.sender_hash);
                    self.events.publish_friend_request(mesh_types::FriendRequestEvent {
                        sender_hash: frame.sender_hash,
                        nickname,
                        friend_code: code,
                    });
                }
            }
            FrameType::Direct => {
                let nickname = self.peers.get(frame.sender_hash).and_then(|p| p.nickname.clone());
                let message = MeshMessage {
                    id: mesh_types::MessageId::from_wire_hash(frame.msg_id_hash),
                    frame_type: FrameType::Direct,
                    sender_hash: frame.sender_hash,
                    nickname,
                    timestamp: frame.timestamp,
                    content: frame.text_lossy(),
                    hop_count: mesh_types::Frame::Directed(frame.clone()).hop_count(),
                    was_relayed: frame.ttl < mesh_types::DEFAULT_TTL,
                    priority: Priority::Normal,
                    latitude: None,
                    longitude: None,
                    target_friend_code: Some(self.local_hash.friend_code()),
                };
                self.message_log.push(message.clone(), now_unix_secs());
                self.events.publish_message(message);
            }
            _ => {}
        }
    }

    /// §4.4/P4/S4: announce frames get a tighter relay radius than other
    /// broadcast types. A hop-0 announce (heard directly from the
    /// originator) is never relayed, and an announce stops propagating
    /// past hop 2 — an announce only needs to reach a node's near
    /// neighborhood, not flood the whole mesh the way a chat message does.
    fn should_relay_by_frame_type(&self, frame: &mesh_types::Frame) -> bool {
        if frame.frame_type() != mesh_types::FrameType::Announce {
            return true;
        }
        let hop_count = frame.hop_count();
        hop_count >= 1 && hop_count < 3
    }

    fn maybe_relay(&mut self, frame: &mesh_types::Frame) {
        if !self.should_relay_by_frame_type(frame) {
            return;
        }
        let Some(decremented) = frame.decremented() else {
            return;
        };
        let now_ms = self.start.elapsed().as_millis() as u64;
        let min_spacing_ms = self.config.timing.relay_spacing_ms;
        if self.relay_tracker.should_relay(
            frame.message_id(),
            decremented.ttl(),
            now_ms,
            min_spacing_ms,
            now_unix_secs(),
        ) {
            self.relay_queue.push(decremented);
            self.peers.mark_relayed(frame.sender_hash());
        }
    }

    async fn drain_relay_queue(&mut self) {
        let now_ms = self.start.elapsed().as_millis() as u64;
        let mut rng = rand::thread_rng();
        if let Some(frame) = self.relay_queue.poll(now_ms, &mut rng) {
            self.send_frame(frame).await;
        }
    }

    async fn maybe_announce(&mut self) {
        let now_ms = self.start.elapsed().as_millis() as u64;
        if !self.announce_scheduler.is_due(now_ms) {
            return;
        }
        self.announce_scheduler.mark_sent(now_ms);
        let text = mesh_codec::format_announce_text(&self.nickname, self.local_hash.friend_code().as_str());
        let frame = mesh_types::Frame::Broadcast(BroadcastFrame {
            frame_type: FrameType::Announce,
            ttl: self.config.timing.default_ttl,
            msg_id_hash: mesh_types::MessageId::generate().0,
            sender_hash: self.local_hash,
            timestamp: now_unix_u32(),
            latitude: f32::NAN,
            longitude: f32::NAN,
            text,
        });
        self.send_frame(frame).await;
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::SendBroadcast { text } => {
                let frame = mesh_types::Frame::Broadcast(BroadcastFrame {
                    frame_type: FrameType::Message,
                    ttl: self.config.timing.default_ttl,
                    msg_id_hash: mesh_types::MessageId::generate().0,
                    sender_hash: self.local_hash,
                    timestamp: now_unix_u32(),
                    latitude: f32::NAN,
                    longitude: f32::NAN,
                    text: text.into_bytes(),
                });
                self.send_frame(frame).await;
            }
            Command::SendSos { text, latitude, longitude } => {
                let frame = mesh_types::Frame::Broadcast(BroadcastFrame {
                    frame_type: FrameType::Sos,
                    ttl: self.config.timing.default_ttl,
                    msg_id_hash: mesh_types::MessageId::generate().0,
                    sender_hash: self.local_hash,
                    timestamp: now_unix_u32(),
                    latitude: latitude.unwrap_or(f32::NAN),
                    longitude: longitude.unwrap_or(f32::NAN),
                    text: text.into_bytes(),
                });
                self.send_frame(frame).await;
            }
            Command::SendDirect { target, text } => {
                let frame = build_directed_frame(
                    FrameType::Direct,
                    self.local_hash,
                    target,
                    now_unix_u32(),
                    text.into_bytes(),
                    self.config.timing.default_ttl,
                );
                self.send_frame(mesh_types::Frame::Directed(frame)).await;
            }
            Command::SendFriendRequest { target } => {
                let text = mesh_codec::format_announce_text(&self.nickname, self.local_hash.friend_code().as_str());
                let frame = build_directed_frame(
                    FrameType::FriendRequest,
                    self.local_hash,
                    target,
                    now_unix_u32(),
                    text,
                    self.config.timing.default_ttl,
                );
                let now_ms = self.start.elapsed().as_millis() as u64;
                self.friend_requests.register(frame.clone(), now_ms);
                self.send_frame(mesh_types::Frame::Directed(frame)).await;
            }
            Command::Status => {
                info!(
                    peers = self.peers.len(),
                    pending_friend_requests = self.friend_requests.pending_count(),
                    logged_messages = self.message_log.len(),
                    "status"
                );
                self.events.publish_status(mesh_types::StatusEvent(format!(
                    "{} peers, {} pending friend requests, {} logged messages",
                    self.peers.len(),
                    self.friend_requests.pending_count(),
                    self.message_log.len(),
                )));
            }
        }
    }

    async fn send_frame(&mut self, frame: mesh_types::Frame) {
        let payload = mesh_codec::encode(&frame);
        let slot = self.advertise_slot.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            if let Err(e) = slot.advertise(mesh_codec::MANUFACTURER_ID, payload).await {
                warn!(error = %e, "send failed");
                events.publish_error(mesh_types::ErrorEvent(format!("send failed: {e}")));
            }
        });
    }

    async fn retry_friend_requests(&mut self) {
        let now_ms = self.start.elapsed().as_millis() as u64;
        for frame in self.friend_requests.tick(now_ms) {
            self.send_frame(mesh_types::Frame::Directed(frame)).await;
        }
    }
}
