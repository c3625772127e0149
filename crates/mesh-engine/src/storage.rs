//! The `PersistencePort` collaborator boundary (§6.3).
//!
//! Durable storage (the node's generated id, nickname, known friends) is
//! platform-specific I/O out of scope for this crate. `PersistencePort` is
//! the narrow trait the engine and `mesh-node` program against; a real
//! application wires a filesystem- or keystore-backed adapter.

use async_trait::async_trait;

use crate::error::Result;

/// Durable engine state the embedding application persists across runs.
#[async_trait]
pub trait PersistencePort: Send + Sync {
    /// Load the previously persisted node id, if any.
    async fn load_node_id(&self) -> Result<Option<String>>;

    /// Persist a freshly generated node id for reuse on next start.
    async fn save_node_id(&self, node_id: &str) -> Result<()>;
}

/// A filesystem-backed `PersistencePort`, storing the node id as a single
/// line of text under the engine's data directory (§6.3).
pub struct FilePersistence {
    path: std::path::PathBuf,
}

impl FilePersistence {
    pub fn new(data_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            path: data_dir.into().join("node_id"),
        }
    }
}

#[async_trait]
impl PersistencePort for FilePersistence {
    async fn load_node_id(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_node_id(&self, node_id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, node_id).await.map_err(Into::into)
    }
}

/// An in-memory `PersistencePort` used by engine tests (§8.1).
#[derive(Default)]
pub struct MemoryPersistence {
    node_id: tokio::sync::Mutex<Option<String>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistencePort for MemoryPersistence {
    async fn load_node_id(&self) -> Result<Option<String>> {
        Ok(self.node_id.lock().await.clone())
    }

    async fn save_node_id(&self, node_id: &str) -> Result<()> {
        *self.node_id.lock().await = Some(node_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_persistence_round_trips() {
        let store = MemoryPersistence::new();
        assert_eq!(store.load_node_id().await.unwrap(), None);
        store.save_node_id("deadbeef").await.unwrap();
        assert_eq!(store.load_node_id().await.unwrap(), Some("deadbeef".to_string()));
    }

    #[tokio::test]
    async fn file_persistence_round_trips() {
        let dir = std::env::temp_dir().join(format!("mesh-test-{:x}", rand::random::<u64>()));
        let store = FilePersistence::new(&dir);
        assert_eq!(store.load_node_id().await.unwrap(), None);
        store.save_node_id("cafebabe").await.unwrap();
        assert_eq!(store.load_node_id().await.unwrap(), Some("cafebabe".to_string()));
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
