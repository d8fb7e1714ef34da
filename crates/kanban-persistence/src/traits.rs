use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kanban_core::KanbanResult;
use kanban_domain::{
    Attachment, AttachmentId, Board, BoardId, Card, CardId, Column, ColumnId, Position, Shift,
    User, UserId,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::store::{StoreState, WriterLock};

/// Metadata written alongside every snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceMetadata {
    /// Version of the snapshot format
    pub format_version: u32,
    /// ID of the store instance that performed the save
    pub instance_id: Uuid,
    /// When this data was saved
    pub saved_at: DateTime<Utc>,
}

impl PersistenceMetadata {
    pub const FORMAT_VERSION: u32 = 1;

    pub fn new(instance_id: Uuid) -> Self {
        Self {
            format_version: Self::FORMAT_VERSION,
            instance_id,
            saved_at: Utc::now(),
        }
    }
}

/// Durable home for the memory store's state.
/// Implementations handle different snapshot targets (file, test doubles).
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist the full state. Must be all-or-nothing.
    async fn save(&self, state: &StoreState) -> KanbanResult<PersistenceMetadata>;

    /// Load the last saved state, or `None` when nothing was saved yet.
    async fn load(&self) -> KanbanResult<Option<(StoreState, PersistenceMetadata)>>;

    async fn exists(&self) -> bool;

    fn path(&self) -> &Path;

    /// The saved state, when another writer replaced the snapshot since
    /// this store last loaded or saved it.
    async fn reload_if_changed(&self) -> KanbanResult<Option<StoreState>> {
        Ok(None)
    }

    /// Keeps other processes from saving until the returned lock drops.
    async fn lock_writers(&self) -> KanbanResult<Option<WriterLock>> {
        Ok(None)
    }
}

/// Entry point of a storage backend.
///
/// Every service operation runs inside exactly one transaction obtained
/// from [`KanbanStore::begin`]. Nothing a transaction writes is visible to
/// other transactions until [`StoreTransaction::commit`] succeeds; dropping
/// a transaction without committing discards its writes.
#[async_trait]
pub trait KanbanStore: Send + Sync {
    async fn begin(&self) -> KanbanResult<Box<dyn StoreTransaction>>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Reads and writes scoped to one transaction.
///
/// Reads observe the transaction's own earlier writes. Update and
/// position-setting methods fail with `NotFound` when the row is gone.
/// Deletes cascade to children and hand back every attachment row removed
/// on the way, so file bytes can be unlinked after commit.
#[async_trait]
pub trait StoreTransaction: Send {
    // Users
    async fn insert_user(&mut self, user: &User) -> KanbanResult<()>;
    /// Lookup by normalized email.
    async fn find_user_by_email(&mut self, email: &str) -> KanbanResult<Option<User>>;

    // Boards
    async fn find_board(&mut self, id: BoardId) -> KanbanResult<Option<Board>>;
    /// Boards owned by the user, newest first.
    async fn list_boards(&mut self, owner_id: UserId) -> KanbanResult<Vec<Board>>;
    async fn insert_board(&mut self, board: &Board) -> KanbanResult<()>;
    async fn update_board(&mut self, board: &Board) -> KanbanResult<()>;
    async fn delete_board(&mut self, id: BoardId) -> KanbanResult<Vec<Attachment>>;

    // Columns
    async fn find_column(&mut self, id: ColumnId) -> KanbanResult<Option<Column>>;
    /// Columns of a board in position order.
    async fn list_columns(&mut self, board_id: BoardId) -> KanbanResult<Vec<Column>>;
    async fn count_columns(&mut self, board_id: BoardId) -> KanbanResult<usize>;
    async fn insert_column(&mut self, column: &Column) -> KanbanResult<()>;
    async fn update_column(&mut self, column: &Column) -> KanbanResult<()>;
    async fn set_column_position(&mut self, id: ColumnId, position: Position) -> KanbanResult<()>;
    /// Applies `shift` to the board's columns, returning how many moved.
    async fn shift_columns(&mut self, board_id: BoardId, shift: Shift) -> KanbanResult<u64>;
    async fn delete_column(&mut self, id: ColumnId) -> KanbanResult<Vec<Attachment>>;

    // Cards
    async fn find_card(&mut self, id: CardId) -> KanbanResult<Option<Card>>;
    /// Active cards of a column in position order.
    async fn list_active_cards(&mut self, column_id: ColumnId) -> KanbanResult<Vec<Card>>;
    async fn count_active_cards(&mut self, column_id: ColumnId) -> KanbanResult<usize>;
    /// Archived cards across a board, most recently archived first.
    async fn list_archived_cards(&mut self, board_id: BoardId) -> KanbanResult<Vec<Card>>;
    async fn insert_card(&mut self, card: &Card) -> KanbanResult<()>;
    async fn update_card(&mut self, card: &Card) -> KanbanResult<()>;
    async fn set_card_position(&mut self, id: CardId, position: Position) -> KanbanResult<()>;
    /// Applies `shift` to the column's active cards only.
    async fn shift_cards(&mut self, column_id: ColumnId, shift: Shift) -> KanbanResult<u64>;
    async fn delete_card(&mut self, id: CardId) -> KanbanResult<Vec<Attachment>>;

    // Attachments
    async fn find_attachment(&mut self, id: AttachmentId) -> KanbanResult<Option<Attachment>>;
    /// Attachments of a card, newest first.
    async fn list_attachments(&mut self, card_id: CardId) -> KanbanResult<Vec<Attachment>>;
    async fn insert_attachment(&mut self, attachment: &Attachment) -> KanbanResult<()>;
    async fn delete_attachment(&mut self, id: AttachmentId) -> KanbanResult<()>;

    async fn commit(self: Box<Self>) -> KanbanResult<()>;
    async fn rollback(self: Box<Self>) -> KanbanResult<()>;
}
