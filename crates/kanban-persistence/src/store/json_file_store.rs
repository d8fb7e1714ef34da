use crate::store::atomic_writer::AtomicWriter;
use crate::store::file_guard::{FileMetadata, WriterLock};
use crate::store::StoreState;
use crate::traits::{PersistenceMetadata, SnapshotStore};
use kanban_core::{KanbanError, KanbanResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

/// JSON file-based snapshot store.
///
/// Several processes may share one file. Each store remembers the file
/// metadata it last loaded or saved; a different metadata on disk means
/// another writer saved in between.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    instance_id: Uuid,
    last_seen: Mutex<Option<FileMetadata>>,
}

/// On-disk layout of a snapshot file
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonEnvelope {
    pub version: u32,
    pub metadata: PersistenceMetadata,
    pub data: StoreState,
}

impl JsonEnvelope {
    pub fn new(metadata: PersistenceMetadata, data: StoreState) -> Self {
        Self {
            version: PersistenceMetadata::FORMAT_VERSION,
            metadata,
            data,
        }
    }
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_instance_id(path, Uuid::new_v4())
    }

    /// Create a store with a specific instance ID
    /// (useful for testing or telling writers apart in the file)
    pub fn with_instance_id(path: impl AsRef<Path>, instance_id: Uuid) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            instance_id,
            last_seen: Mutex::new(None),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    async fn read_envelope(&self) -> KanbanResult<JsonEnvelope> {
        let file_bytes = AtomicWriter::read_all(&self.path).await?;

        let envelope: JsonEnvelope = serde_json::from_slice(&file_bytes)
            .map_err(|e| KanbanError::Serialization(e.to_string()))?;

        if envelope.version != PersistenceMetadata::FORMAT_VERSION {
            return Err(KanbanError::Serialization(format!(
                "Unsupported format version: {}",
                envelope.version
            )));
        }

        tracing::info!(
            "Loaded {} bytes from {}",
            file_bytes.len(),
            self.path.display()
        );
        Ok(envelope)
    }
}

#[async_trait::async_trait]
impl SnapshotStore for JsonFileStore {
    async fn save(&self, state: &StoreState) -> KanbanResult<PersistenceMetadata> {
        let metadata = PersistenceMetadata::new(self.instance_id);
        let envelope = JsonEnvelope::new(metadata.clone(), state.clone());

        let json_bytes = serde_json::to_vec_pretty(&envelope)
            .map_err(|e| KanbanError::Serialization(e.to_string()))?;

        AtomicWriter::write_atomic(&self.path, &json_bytes).await?;
        *self.last_seen.lock().await = FileMetadata::read(&self.path).await?;

        tracing::info!(
            "Saved {} bytes to {}",
            json_bytes.len(),
            self.path.display()
        );

        Ok(metadata)
    }

    async fn load(&self) -> KanbanResult<Option<(StoreState, PersistenceMetadata)>> {
        let mut last_seen = self.last_seen.lock().await;
        // Taken before reading, so a save racing the read shows up as a change later.
        let current = FileMetadata::read(&self.path).await?;
        if current.is_none() {
            *last_seen = None;
            return Ok(None);
        }

        let envelope = self.read_envelope().await?;
        *last_seen = current;
        Ok(Some((envelope.data, envelope.metadata)))
    }

    async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn reload_if_changed(&self) -> KanbanResult<Option<StoreState>> {
        let mut last_seen = self.last_seen.lock().await;
        let current = FileMetadata::read(&self.path).await?;
        if current == *last_seen {
            return Ok(None);
        }

        let state = match current {
            Some(_) => self.read_envelope().await?.data,
            None => StoreState::default(),
        };
        *last_seen = current;

        tracing::info!(
            "{} was changed by another writer, reloaded",
            self.path.display()
        );
        Ok(Some(state))
    }

    async fn lock_writers(&self) -> KanbanResult<Option<WriterLock>> {
        WriterLock::acquire(&self.path).await.map(Some)
    }
}
