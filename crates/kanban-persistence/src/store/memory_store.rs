use crate::store::json_file_store::JsonFileStore;
use crate::store::state::{Applied, StoreState, Write};
use crate::traits::{KanbanStore, SnapshotStore, StoreTransaction};
use async_trait::async_trait;
use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    Attachment, AttachmentId, Board, BoardId, Card, CardId, Column, ColumnId, Position, Shift,
    User, UserId,
};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-process store.
///
/// A transaction works on a private copy of the committed state taken at
/// `begin` and records every write in a journal. Commit replays the
/// journal onto the latest committed state; if any write no longer
/// applies, the commit fails with `Conflict` and nothing changes. When a
/// snapshot store is attached, the new state is saved before it becomes
/// visible, so a failed save also leaves the committed state untouched.
///
/// Other processes may save the same snapshot. `begin` picks up their
/// saves. Commit holds the snapshot's writer lock from the freshness check
/// through the save; a foreign save since `begin` fails the commit with
/// `Conflict` after reloading, so a retry sees it.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<StoreState>,
    snapshots: Option<Box<dyn SnapshotStore>>,
    /// Bumped under the state lock whenever a foreign save is loaded.
    reloads: AtomicU64,
}

impl Shared {
    /// Swaps in the snapshot another process saved.
    fn adopt(&self, committed: &mut StoreState, fresh: StoreState) {
        *committed = fresh;
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_parts(StoreState::default(), None)
    }

    /// Opens a JSON-backed store, loading the file when it exists.
    pub async fn open(path: impl AsRef<Path>) -> KanbanResult<Self> {
        Self::with_snapshots(Box::new(JsonFileStore::new(path))).await
    }

    pub async fn with_snapshots(snapshots: Box<dyn SnapshotStore>) -> KanbanResult<Self> {
        let state = match snapshots.load().await? {
            Some((state, metadata)) => {
                tracing::info!(
                    "Loaded snapshot saved at {} by instance {}",
                    metadata.saved_at,
                    metadata.instance_id
                );
                state
            }
            None => {
                tracing::info!(
                    "No snapshot at {}, starting empty",
                    snapshots.path().display()
                );
                StoreState::default()
            }
        };
        Ok(Self::from_parts(state, Some(snapshots)))
    }

    fn from_parts(state: StoreState, snapshots: Option<Box<dyn SnapshotStore>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                snapshots,
                reloads: AtomicU64::new(0),
            }),
        }
    }

    /// Copy of the committed state.
    pub async fn snapshot(&self) -> StoreState {
        self.shared.state.lock().await.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KanbanStore for MemoryStore {
    async fn begin(&self) -> KanbanResult<Box<dyn StoreTransaction>> {
        let mut committed = self.shared.state.lock().await;
        if let Some(snapshots) = &self.shared.snapshots {
            if let Some(fresh) = snapshots.reload_if_changed().await? {
                self.shared.adopt(&mut committed, fresh);
            }
        }
        let working = committed.clone();
        let reloads = self.shared.reloads.load(Ordering::SeqCst);
        drop(committed);
        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            working,
            reloads,
            journal: Vec::new(),
        }))
    }

    fn backend(&self) -> &'static str {
        if self.shared.snapshots.is_some() {
            "json"
        } else {
            "memory"
        }
    }
}

pub struct MemoryTransaction {
    shared: Arc<Shared>,
    working: StoreState,
    reloads: u64,
    journal: Vec<Write>,
}

impl MemoryTransaction {
    fn write(&mut self, write: Write) -> KanbanResult<Applied> {
        let applied = self.working.apply(&write)?;
        self.journal.push(write);
        Ok(applied)
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn insert_user(&mut self, user: &User) -> KanbanResult<()> {
        self.write(Write::InsertUser(user.clone())).map(|_| ())
    }

    async fn find_user_by_email(&mut self, email: &str) -> KanbanResult<Option<User>> {
        Ok(self.working.user_by_email(email).cloned())
    }

    async fn find_board(&mut self, id: BoardId) -> KanbanResult<Option<Board>> {
        Ok(self.working.boards.get(&id).cloned())
    }

    async fn list_boards(&mut self, owner_id: UserId) -> KanbanResult<Vec<Board>> {
        Ok(self.working.boards_of(owner_id))
    }

    async fn insert_board(&mut self, board: &Board) -> KanbanResult<()> {
        self.write(Write::InsertBoard(board.clone())).map(|_| ())
    }

    async fn update_board(&mut self, board: &Board) -> KanbanResult<()> {
        self.write(Write::UpdateBoard(board.clone())).map(|_| ())
    }

    async fn delete_board(&mut self, id: BoardId) -> KanbanResult<Vec<Attachment>> {
        Ok(self.write(Write::DeleteBoard(id))?.removed)
    }

    async fn find_column(&mut self, id: ColumnId) -> KanbanResult<Option<Column>> {
        Ok(self.working.columns.get(&id).cloned())
    }

    async fn list_columns(&mut self, board_id: BoardId) -> KanbanResult<Vec<Column>> {
        Ok(self.working.columns_of(board_id))
    }

    async fn count_columns(&mut self, board_id: BoardId) -> KanbanResult<usize> {
        Ok(self
            .working
            .columns
            .values()
            .filter(|c| c.board_id == board_id)
            .count())
    }

    async fn insert_column(&mut self, column: &Column) -> KanbanResult<()> {
        self.write(Write::InsertColumn(column.clone())).map(|_| ())
    }

    async fn update_column(&mut self, column: &Column) -> KanbanResult<()> {
        self.write(Write::UpdateColumn(column.clone())).map(|_| ())
    }

    async fn set_column_position(&mut self, id: ColumnId, position: Position) -> KanbanResult<()> {
        self.write(Write::SetColumnPosition(id, position)).map(|_| ())
    }

    async fn shift_columns(&mut self, board_id: BoardId, shift: Shift) -> KanbanResult<u64> {
        Ok(self.write(Write::ShiftColumns(board_id, shift))?.shifted)
    }

    async fn delete_column(&mut self, id: ColumnId) -> KanbanResult<Vec<Attachment>> {
        Ok(self.write(Write::DeleteColumn(id))?.removed)
    }

    async fn find_card(&mut self, id: CardId) -> KanbanResult<Option<Card>> {
        Ok(self.working.cards.get(&id).cloned())
    }

    async fn list_active_cards(&mut self, column_id: ColumnId) -> KanbanResult<Vec<Card>> {
        Ok(self.working.active_cards_of(column_id))
    }

    async fn count_active_cards(&mut self, column_id: ColumnId) -> KanbanResult<usize> {
        Ok(self
            .working
            .cards
            .values()
            .filter(|c| c.column_id == column_id && c.is_active())
            .count())
    }

    async fn list_archived_cards(&mut self, board_id: BoardId) -> KanbanResult<Vec<Card>> {
        Ok(self.working.archived_cards_of(board_id))
    }

    async fn insert_card(&mut self, card: &Card) -> KanbanResult<()> {
        self.write(Write::InsertCard(card.clone())).map(|_| ())
    }

    async fn update_card(&mut self, card: &Card) -> KanbanResult<()> {
        self.write(Write::UpdateCard(card.clone())).map(|_| ())
    }

    async fn set_card_position(&mut self, id: CardId, position: Position) -> KanbanResult<()> {
        self.write(Write::SetCardPosition(id, position)).map(|_| ())
    }

    async fn shift_cards(&mut self, column_id: ColumnId, shift: Shift) -> KanbanResult<u64> {
        Ok(self.write(Write::ShiftCards(column_id, shift))?.shifted)
    }

    async fn delete_card(&mut self, id: CardId) -> KanbanResult<Vec<Attachment>> {
        Ok(self.write(Write::DeleteCard(id))?.removed)
    }

    async fn find_attachment(&mut self, id: AttachmentId) -> KanbanResult<Option<Attachment>> {
        Ok(self.working.attachments.get(&id).cloned())
    }

    async fn list_attachments(&mut self, card_id: CardId) -> KanbanResult<Vec<Attachment>> {
        Ok(self.working.attachments_of(card_id))
    }

    async fn insert_attachment(&mut self, attachment: &Attachment) -> KanbanResult<()> {
        self.write(Write::InsertAttachment(attachment.clone()))
            .map(|_| ())
    }

    async fn delete_attachment(&mut self, id: AttachmentId) -> KanbanResult<()> {
        self.write(Write::DeleteAttachment(id)).map(|_| ())
    }

    async fn commit(self: Box<Self>) -> KanbanResult<()> {
        if self.journal.is_empty() {
            return Ok(());
        }

        let mut committed = self.shared.state.lock().await;
        let _writer_lock = match &self.shared.snapshots {
            Some(snapshots) => {
                let lock = snapshots.lock_writers().await?;
                if let Some(fresh) = snapshots.reload_if_changed().await? {
                    self.shared.adopt(&mut committed, fresh);
                }
                if self.shared.reloads.load(Ordering::SeqCst) != self.reloads {
                    return Err(KanbanError::Conflict(
                        "Data file was changed by another process, retry the request".to_string(),
                    ));
                }
                lock
            }
            None => None,
        };

        let mut next = committed.clone();
        for write in &self.journal {
            next.apply(write).map_err(|e| {
                KanbanError::Conflict(format!("Concurrent write invalidated commit: {}", e))
            })?;
        }

        if let Some(snapshots) = &self.shared.snapshots {
            snapshots.save(&next).await?;
        }
        *committed = next;

        tracing::debug!("Committed {} writes", self.journal.len());
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> KanbanResult<()> {
        tracing::debug!("Rolled back {} writes", self.journal.len());
        Ok(())
    }
}
