use kanban_core::KanbanResult;
use std::path::Path;
use tokio::fs;

/// Writes snapshot files through a temp file and a rename, so readers see
/// either the previous snapshot or the new one and never a torn write.
pub struct AtomicWriter;

impl AtomicWriter {
    pub async fn write_atomic(path: &Path, data: &[u8]) -> KanbanResult<()> {
        // The temp file must live on the same filesystem as the target.
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).await?;

        let temp_file = tempfile::NamedTempFile::new_in(parent)?;
        fs::write(temp_file.path(), data).await?;
        temp_file.persist(path).map_err(|e| e.error)?;

        tracing::debug!(
            "Atomically wrote {} bytes to {}",
            data.len(),
            path.display()
        );
        Ok(())
    }

    pub async fn read_all(path: &Path) -> KanbanResult<Vec<u8>> {
        let data = fs::read(path).await?;
        tracing::debug!("Read {} bytes from {}", data.len(), path.display());
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_atomic_write_overwrites() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("kanban.json");

        AtomicWriter::write_atomic(&file_path, b"{\"v\":1}")
            .await
            .unwrap();
        AtomicWriter::write_atomic(&file_path, b"{\"v\":2}")
            .await
            .unwrap();

        let read_data = AtomicWriter::read_all(&file_path).await.unwrap();
        assert_eq!(read_data, b"{\"v\":2}");
    }

    #[tokio::test]
    async fn test_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("data").join("boards").join("kanban.json");

        AtomicWriter::write_atomic(&file_path, b"{}").await.unwrap();

        assert!(file_path.exists());
        // Only the target remains; the temp file was renamed away.
        let entries = std::fs::read_dir(file_path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }
}
