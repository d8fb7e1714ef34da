use async_trait::async_trait;
use kanban_core::KanbanResult;
use serde::{Deserialize, Serialize};

use crate::{
    Attachment, AttachmentId, Board, BoardId, BoardSummary, BoardUpdate, BoardView, Card, CardId,
    CardUpdate, Column, ColumnId, NewAttachment, NewBoard, NewCard, NewUser, Position, User,
    UserId,
};

/// Outcome of a card move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardMove {
    pub card: Card,
    pub from_column_id: ColumnId,
    pub to_column_id: ColumnId,
}

/// Rows removed by a cascading delete. The attachments are returned so
/// the file storage layer can unlink their bytes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Removal {
    pub id: uuid::Uuid,
    pub attachments: Vec<Attachment>,
}

/// The library contract of the kanban core.
///
/// Every mutating method takes the acting user, checks ownership of each
/// entity it touches, runs as one transaction, and publishes a change
/// event only after commit.
#[async_trait]
pub trait KanbanOperations: Send + Sync {
    // User operations
    async fn register_user(&self, input: NewUser) -> KanbanResult<User>;
    async fn find_user_by_email(&self, email: &str) -> KanbanResult<Option<User>>;

    // Board operations
    async fn create_board(&self, user_id: UserId, input: NewBoard) -> KanbanResult<BoardView>;
    async fn list_boards(&self, user_id: UserId) -> KanbanResult<Vec<BoardSummary>>;
    async fn get_board(&self, user_id: UserId, id: BoardId) -> KanbanResult<BoardView>;
    async fn update_board(
        &self,
        user_id: UserId,
        id: BoardId,
        updates: BoardUpdate,
    ) -> KanbanResult<Board>;
    async fn delete_board(&self, user_id: UserId, id: BoardId) -> KanbanResult<Removal>;

    // Column operations
    async fn create_column(
        &self,
        user_id: UserId,
        board_id: BoardId,
        title: String,
    ) -> KanbanResult<Column>;
    async fn rename_column(
        &self,
        user_id: UserId,
        id: ColumnId,
        title: String,
    ) -> KanbanResult<Column>;
    async fn move_column(
        &self,
        user_id: UserId,
        id: ColumnId,
        position: Position,
    ) -> KanbanResult<Vec<Column>>;
    async fn delete_column(&self, user_id: UserId, id: ColumnId) -> KanbanResult<Removal>;
    async fn reorder_columns(
        &self,
        user_id: UserId,
        board_id: BoardId,
        column_ids: Vec<ColumnId>,
    ) -> KanbanResult<Vec<Column>>;

    // Card operations
    async fn create_card(
        &self,
        user_id: UserId,
        column_id: ColumnId,
        input: NewCard,
    ) -> KanbanResult<Card>;
    async fn get_card(&self, user_id: UserId, id: CardId) -> KanbanResult<Card>;
    async fn update_card(
        &self,
        user_id: UserId,
        id: CardId,
        updates: CardUpdate,
    ) -> KanbanResult<Card>;
    async fn delete_card(&self, user_id: UserId, id: CardId) -> KanbanResult<Removal>;
    async fn move_card(
        &self,
        user_id: UserId,
        id: CardId,
        column_id: ColumnId,
        position: Position,
    ) -> KanbanResult<CardMove>;
    async fn reorder_cards(
        &self,
        user_id: UserId,
        column_id: ColumnId,
        card_ids: Vec<CardId>,
    ) -> KanbanResult<Vec<Card>>;

    // Archival
    async fn archive_card(&self, user_id: UserId, id: CardId) -> KanbanResult<Card>;
    async fn restore_card(&self, user_id: UserId, id: CardId) -> KanbanResult<Card>;
    async fn delete_archived_card(&self, user_id: UserId, id: CardId) -> KanbanResult<Removal>;
    async fn list_archived_cards(
        &self,
        user_id: UserId,
        board_id: BoardId,
    ) -> KanbanResult<Vec<Card>>;

    // Attachment metadata
    async fn add_attachment(
        &self,
        user_id: UserId,
        card_id: CardId,
        input: NewAttachment,
    ) -> KanbanResult<Attachment>;
    async fn list_attachments(
        &self,
        user_id: UserId,
        card_id: CardId,
    ) -> KanbanResult<Vec<Attachment>>;
    async fn get_attachment(&self, user_id: UserId, id: AttachmentId) -> KanbanResult<Attachment>;
    async fn delete_attachment(
        &self,
        user_id: UserId,
        id: AttachmentId,
    ) -> KanbanResult<Attachment>;
}
