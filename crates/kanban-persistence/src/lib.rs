pub mod store;
pub mod traits;

pub use store::*;
pub use traits::*;

use kanban_core::{KanbanResult, StorageBackend, StorageConfig};
use std::sync::Arc;

/// Opens the backend selected by configuration.
pub async fn open_store(config: &StorageConfig) -> KanbanResult<Arc<dyn KanbanStore>> {
    let store: Arc<dyn KanbanStore> = match config.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::Json => Arc::new(MemoryStore::open(&config.path).await?),
        #[cfg(feature = "sqlite")]
        StorageBackend::Sqlite => Arc::new(SqliteStore::open(&config.path).await?),
        #[cfg(not(feature = "sqlite"))]
        StorageBackend::Sqlite => {
            return Err(kanban_core::KanbanError::Validation(
                "SQLite storage requires building with the `sqlite` feature".to_string(),
            ))
        }
    };

    tracing::info!(
        backend = store.backend(),
        path = %config.path.display(),
        "Opened kanban store"
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_memory_backend_ignores_path() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            path: PathBuf::from("/nonexistent/dir/kanban.json"),
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.backend(), "memory");
    }

    #[cfg(not(feature = "sqlite"))]
    #[tokio::test]
    async fn test_sqlite_backend_needs_feature() {
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            path: PathBuf::from("kanban.db"),
        };
        assert!(matches!(
            open_store(&config).await,
            Err(kanban_core::KanbanError::Validation(_))
        ));
    }
}
