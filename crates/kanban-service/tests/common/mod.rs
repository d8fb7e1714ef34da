#![allow(dead_code)]

use async_trait::async_trait;
use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    Attachment, AttachmentId, Board, BoardId, BoardView, Card, CardId, Column, ColumnId,
    KanbanOperations, NewBoard, NewCard, Position, Shift, User, UserId,
};
use kanban_persistence::{KanbanStore, MemoryStore, StoreState, StoreTransaction};
use kanban_service::{BoardService, NoopNotifier};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub struct Harness {
    pub service: BoardService,
    pub store: MemoryStore,
    pub owner: UserId,
}

pub fn harness() -> Harness {
    let store = MemoryStore::new();
    let service = BoardService::new(Arc::new(store.clone()), Arc::new(NoopNotifier));
    Harness {
        service,
        store,
        owner: Uuid::new_v4(),
    }
}

impl Harness {
    pub async fn board(&self, title: &str) -> BoardView {
        self.service
            .create_board(
                self.owner,
                NewBoard {
                    title: title.to_string(),
                    icon: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn cards(&self, column_id: ColumnId, titles: &[&str]) -> Vec<Card> {
        let mut cards = Vec::new();
        for title in titles {
            cards.push(
                self.service
                    .create_card(self.owner, column_id, NewCard::titled(*title))
                    .await
                    .unwrap(),
            );
        }
        cards
    }

    /// `(title, position)` of the column's active cards in display order.
    pub async fn layout(&self, column_id: ColumnId) -> Vec<(String, Position)> {
        let state = self.store.snapshot().await;
        state
            .active_cards_of(column_id)
            .into_iter()
            .map(|c| (c.title, c.position))
            .collect()
    }
}

pub fn entries(pairs: &[(&str, Position)]) -> Vec<(String, Position)> {
    pairs
        .iter()
        .map(|(title, position)| (title.to_string(), *position))
        .collect()
}

pub fn column_id(view: &BoardView, title: &str) -> ColumnId {
    view.column(title).unwrap().column.id
}

/// Store wrapper that fails the Nth write of every transaction it opens,
/// counting from 1. Reads are never failed.
#[derive(Clone)]
pub struct FaultyStore {
    inner: MemoryStore,
    fail_at: Arc<AtomicUsize>,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_at: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fail_on_write(&self, nth: usize) {
        self.fail_at.store(nth, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.fail_at.store(0, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> StoreState {
        self.inner.snapshot().await
    }
}

#[async_trait]
impl KanbanStore for FaultyStore {
    async fn begin(&self) -> KanbanResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(FaultyTransaction {
            inner: self.inner.begin().await?,
            fail_at: self.fail_at.load(Ordering::SeqCst),
            writes: 0,
        }))
    }

    fn backend(&self) -> &'static str {
        "faulty"
    }
}

struct FaultyTransaction {
    inner: Box<dyn StoreTransaction>,
    fail_at: usize,
    writes: usize,
}

impl FaultyTransaction {
    fn tick(&mut self) -> KanbanResult<()> {
        self.writes += 1;
        if self.fail_at != 0 && self.writes == self.fail_at {
            return Err(KanbanError::Database(format!(
                "injected failure on write {}",
                self.writes
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for FaultyTransaction {
    async fn insert_user(&mut self, user: &User) -> KanbanResult<()> {
        self.tick()?;
        self.inner.insert_user(user).await
    }

    async fn find_user_by_email(&mut self, email: &str) -> KanbanResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }

    async fn find_board(&mut self, id: BoardId) -> KanbanResult<Option<Board>> {
        self.inner.find_board(id).await
    }

    async fn list_boards(&mut self, owner_id: UserId) -> KanbanResult<Vec<Board>> {
        self.inner.list_boards(owner_id).await
    }

    async fn insert_board(&mut self, board: &Board) -> KanbanResult<()> {
        self.tick()?;
        self.inner.insert_board(board).await
    }

    async fn update_board(&mut self, board: &Board) -> KanbanResult<()> {
        self.tick()?;
        self.inner.update_board(board).await
    }

    async fn delete_board(&mut self, id: BoardId) -> KanbanResult<Vec<Attachment>> {
        self.tick()?;
        self.inner.delete_board(id).await
    }

    async fn find_column(&mut self, id: ColumnId) -> KanbanResult<Option<Column>> {
        self.inner.find_column(id).await
    }

    async fn list_columns(&mut self, board_id: BoardId) -> KanbanResult<Vec<Column>> {
        self.inner.list_columns(board_id).await
    }

    async fn count_columns(&mut self, board_id: BoardId) -> KanbanResult<usize> {
        self.inner.count_columns(board_id).await
    }

    async fn insert_column(&mut self, column: &Column) -> KanbanResult<()> {
        self.tick()?;
        self.inner.insert_column(column).await
    }

    async fn update_column(&mut self, column: &Column) -> KanbanResult<()> {
        self.tick()?;
        self.inner.update_column(column).await
    }

    async fn set_column_position(&mut self, id: ColumnId, position: Position) -> KanbanResult<()> {
        self.tick()?;
        self.inner.set_column_position(id, position).await
    }

    async fn shift_columns(&mut self, board_id: BoardId, shift: Shift) -> KanbanResult<u64> {
        self.tick()?;
        self.inner.shift_columns(board_id, shift).await
    }

    async fn delete_column(&mut self, id: ColumnId) -> KanbanResult<Vec<Attachment>> {
        self.tick()?;
        self.inner.delete_column(id).await
    }

    async fn find_card(&mut self, id: CardId) -> KanbanResult<Option<Card>> {
        self.inner.find_card(id).await
    }

    async fn list_active_cards(&mut self, column_id: ColumnId) -> KanbanResult<Vec<Card>> {
        self.inner.list_active_cards(column_id).await
    }

    async fn count_active_cards(&mut self, column_id: ColumnId) -> KanbanResult<usize> {
        self.inner.count_active_cards(column_id).await
    }

    async fn list_archived_cards(&mut self, board_id: BoardId) -> KanbanResult<Vec<Card>> {
        self.inner.list_archived_cards(board_id).await
    }

    async fn insert_card(&mut self, card: &Card) -> KanbanResult<()> {
        self.tick()?;
        self.inner.insert_card(card).await
    }

    async fn update_card(&mut self, card: &Card) -> KanbanResult<()> {
        self.tick()?;
        self.inner.update_card(card).await
    }

    async fn set_card_position(&mut self, id: CardId, position: Position) -> KanbanResult<()> {
        self.tick()?;
        self.inner.set_card_position(id, position).await
    }

    async fn shift_cards(&mut self, column_id: ColumnId, shift: Shift) -> KanbanResult<u64> {
        self.tick()?;
        self.inner.shift_cards(column_id, shift).await
    }

    async fn delete_card(&mut self, id: CardId) -> KanbanResult<Vec<Attachment>> {
        self.tick()?;
        self.inner.delete_card(id).await
    }

    async fn find_attachment(&mut self, id: AttachmentId) -> KanbanResult<Option<Attachment>> {
        self.inner.find_attachment(id).await
    }

    async fn list_attachments(&mut self, card_id: CardId) -> KanbanResult<Vec<Attachment>> {
        self.inner.list_attachments(card_id).await
    }

    async fn insert_attachment(&mut self, attachment: &Attachment) -> KanbanResult<()> {
        self.tick()?;
        self.inner.insert_attachment(attachment).await
    }

    async fn delete_attachment(&mut self, id: AttachmentId) -> KanbanResult<()> {
        self.tick()?;
        self.inner.delete_attachment(id).await
    }

    async fn commit(self: Box<Self>) -> KanbanResult<()> {
        let this = *self;
        this.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> KanbanResult<()> {
        let this = *self;
        this.inner.rollback().await
    }
}
