//! mesh-node: a standalone opportunistic BLE mesh messaging node.
//!
//! Single OS process running a Tokio async runtime, driving one
//! [`mesh_engine::MeshEngine`]. Commands arrive as newline-delimited text on
//! stdin (§2.1, point 13); events are logged to stderr via `tracing` as
//! they're published on the engine's [`mesh_engine::EventBus`].
//!
//! BLE radio access is a platform concern this crate does not provide
//! (§6.1: Non-goal). It runs against [`mesh_engine::MockRadio`], which
//! accepts advertise/scan lifecycle calls without touching real hardware —
//! an embedding application swaps in a platform adapter behind
//! `mesh_engine::RadioPort` to actually go on air.

use std::sync::Arc;

use mesh_engine::{Command, MeshConfig, MeshEngine, MockRadio, PersistencePort};
use mesh_types::NodeId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("mesh_node=info,mesh_engine=info")),
        )
        .init();

    info!("mesh-node starting");

    let config = MeshConfig::load()?;
    let data_dir = MeshConfig::default_data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let persistence = mesh_engine::FilePersistence::new(&data_dir);
    let node_id = match persistence.load_node_id().await? {
        Some(id) => id.parse::<NodeId>().unwrap_or_else(|_| NodeId::generate()),
        None => {
            let id = NodeId::generate();
            persistence.save_node_id(id.as_str()).await?;
            id
        }
    };
    info!(node_id = %node_id, friend_code = %node_id.node_hash().friend_code(), "identity loaded");

    let radio = Arc::new(MockRadio::new());
    let (inbound_tx, inbound_rx) = mpsc::channel(256);
    let (command_tx, command_rx) = mpsc::channel(64);
    drop(inbound_tx); // no real radio feed wired up; see module docs.

    let engine = MeshEngine::new(
        node_id,
        config.identity.nickname.clone(),
        config,
        radio,
        inbound_rx,
        command_rx,
    );

    let events = engine.events();
    spawn_event_loggers(&events);

    let run_handle = tokio::spawn(engine.run());

    tokio::select! {
        result = read_commands(command_tx) => {
            if let Err(e) = result {
                warn!(error = %e, "command input loop ended with error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    run_handle.abort();
    Ok(())
}

fn spawn_event_loggers(events: &Arc<mesh_engine::EventBus>) {
    let mut messages = events.subscribe_messages();
    tokio::spawn(async move {
        while let Ok(msg) = messages.recv().await {
            info!(sender = %msg.sender_hash, content = %msg.content, "message received");
        }
    });

    let mut errors = events.subscribe_errors();
    tokio::spawn(async move {
        while let Ok(err) = errors.recv().await {
            error!(message = %err.0, "engine error");
        }
    });

    let mut status = events.subscribe_status();
    tokio::spawn(async move {
        while let Ok(s) = status.recv().await {
            info!(message = %s.0, "status");
        }
    });
}

/// Reads newline-delimited commands from stdin:
///   send <text>
///   sos <text>
///   add-friend <friend-code-hex>
///   status
async fn read_commands(command_tx: mpsc::Sender<Command>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(cmd) = parse_command(&line) else {
            warn!(%line, "unrecognized command");
            continue;
        };
        if command_tx.send(cmd).await.is_err() {
            break;
        }
    }
    Ok(())
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.trim().splitn(2, ' ');
    let verb = parts.next()?;
    let rest = parts.next().unwrap_or("").to_string();
    match verb {
        "send" if !rest.is_empty() => Some(Command::SendBroadcast { text: rest }),
        "sos" if !rest.is_empty() => Some(Command::SendSos {
            text: rest,
            latitude: None,
            longitude: None,
        }),
        "add-friend" => {
            let friend_code: mesh_types::FriendCode = rest.parse().ok()?;
            Some(Command::SendFriendRequest {
                target: friend_code.to_node_hash(),
            })
        }
        "status" => Some(Command::Status),
        _ => None,
    }
}
