use fs2::FileExt;
use kanban_core::{KanbanError, KanbanResult};
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// What a snapshot file looked like when this process last read or wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub modified_time: SystemTime,
    pub size: u64,
}

impl FileMetadata {
    /// `None` when the file does not exist.
    pub async fn read(path: &Path) -> KanbanResult<Option<Self>> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => Ok(Some(Self {
                modified_time: metadata.modified()?,
                size: metadata.len(),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Exclusive advisory lock on `<snapshot>.lock`, shared by every process
/// that writes the same snapshot. Released when dropped.
#[derive(Debug)]
pub struct WriterLock {
    _file: File,
}

impl WriterLock {
    /// Blocks until no other process holds the lock for `snapshot`.
    pub async fn acquire(snapshot: &Path) -> KanbanResult<Self> {
        let path = lock_path(snapshot);
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| KanbanError::Internal(format!("Lock task failed: {}", e)))??;

        Ok(Self { _file: file })
    }
}

fn lock_path(snapshot: &Path) -> PathBuf {
    let mut name = snapshot
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("kanban"));
    name.push(".lock");
    snapshot.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_has_no_metadata() {
        let dir = tempdir().unwrap();
        let metadata = FileMetadata::read(&dir.path().join("absent.json"))
            .await
            .unwrap();
        assert!(metadata.is_none());
    }

    #[tokio::test]
    async fn test_size_change_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kanban.json");
        std::fs::write(&path, b"content1").unwrap();
        let before = FileMetadata::read(&path).await.unwrap().unwrap();
        assert_eq!(before.size, 8);

        std::fs::write(&path, b"content1_longer").unwrap();
        let after = FileMetadata::read(&path).await.unwrap();
        assert_ne!(after, Some(before));
    }

    #[test]
    fn test_lock_file_sits_next_to_snapshot() {
        assert_eq!(
            lock_path(Path::new("/data/kanban.json")),
            PathBuf::from("/data/kanban.json.lock")
        );
    }

    #[tokio::test]
    async fn test_second_writer_waits_for_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kanban.json");

        let first = WriterLock::acquire(&path).await.unwrap();
        let waiter = {
            let path = path.clone();
            tokio::spawn(async move { WriterLock::acquire(&path).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(first);
        let second = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(second.is_ok());
    }
}
