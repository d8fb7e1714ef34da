//! Per-board serialization.
//!
//! Every mutation holds its board's lock across guard, ledger and write,
//! so two writers never plan shifts against the same stale positions.
//! Boards never contend with each other.

use dashmap::DashMap;
use kanban_domain::BoardId;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct ScopeLocks {
    scopes: DashMap<BoardId, Arc<Mutex<()>>>,
}

/// Held locks; released on drop.
#[must_use]
pub struct ScopeGuard {
    _held: Vec<OwnedMutexGuard<()>>,
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, board_id: BoardId) -> ScopeGuard {
        let held = self.scope(board_id).lock_owned().await;
        ScopeGuard { _held: vec![held] }
    }

    /// Locks several boards in ascending id order so that two callers
    /// locking the same pair cannot deadlock.
    pub async fn lock_all(&self, board_ids: &[BoardId]) -> ScopeGuard {
        let mut ids = board_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut held = Vec::with_capacity(ids.len());
        for id in ids {
            held.push(self.scope(id).lock_owned().await);
        }
        ScopeGuard { _held: held }
    }

    /// Drops the entry of a deleted board unless someone is waiting on it.
    pub fn forget(&self, board_id: BoardId) {
        self.scopes
            .remove_if(&board_id, |_, scope| Arc::strong_count(scope) == 1);
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    fn scope(&self, board_id: BoardId) -> Arc<Mutex<()>> {
        // Clone out so no map shard stays locked across the await.
        Arc::clone(self.scopes.entry(board_id).or_default().value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_same_board_serializes() {
        let locks = Arc::new(ScopeLocks::new());
        let board = Uuid::new_v4();

        let held = locks.lock(board).await;
        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock(board).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(held);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_disjoint_boards_do_not_contend() {
        let locks = ScopeLocks::new();
        let _first = locks.lock(Uuid::new_v4()).await;
        let second = tokio::time::timeout(Duration::from_millis(100), locks.lock(Uuid::new_v4()))
            .await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_lock_all_tolerates_duplicates_and_order() {
        let locks = ScopeLocks::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let guard = locks.lock_all(&[b, a, b]).await;
        drop(guard);
        let _again = locks.lock_all(&[a, b]).await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_forget_releases_idle_entries() {
        let locks = ScopeLocks::new();
        let board = Uuid::new_v4();
        drop(locks.lock(board).await);
        locks.forget(board);
        assert!(locks.is_empty());
    }
}
