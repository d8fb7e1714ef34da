use async_trait::async_trait;
use chrono::Utc;
use kanban_core::{BoardConfig, KanbanError, KanbanResult};
use kanban_domain::position::{self, Slot};
use kanban_domain::validation::{clean_title, ensure_position};
use kanban_domain::{
    Attachment, AttachmentId, Board, BoardId, BoardSummary, BoardUpdate, BoardView, Card, CardId,
    CardMove, CardUpdate, ChangeEvent, ChangeNotifier, ChangeOperation, ChangePayload, Column,
    ColumnId, ColumnView, EntityKind, KanbanOperations, NewAttachment, NewBoard, NewCard, NewUser,
    Position, Removal, User, UserId,
};
use kanban_persistence::{KanbanStore, StoreTransaction};
use std::sync::Arc;

use crate::guard;
use crate::locks::ScopeLocks;

/// Implements [`KanbanOperations`] over any [`KanbanStore`].
///
/// A mutation first resolves which board it touches, takes that board's
/// scope lock, then re-runs the ownership guard inside its transaction. If
/// the entity has left the locked board in the meantime the call fails
/// with `Conflict`. Events go out only after a successful commit.
pub struct BoardService {
    store: Arc<dyn KanbanStore>,
    notifier: Arc<dyn ChangeNotifier>,
    locks: ScopeLocks,
    config: BoardConfig,
}

impl BoardService {
    pub fn new(store: Arc<dyn KanbanStore>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self {
            store,
            notifier,
            locks: ScopeLocks::new(),
            config: BoardConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BoardConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn KanbanStore> {
        &self.store
    }

    fn publish(
        &self,
        kind: EntityKind,
        operation: ChangeOperation,
        board_id: BoardId,
        payload: ChangePayload,
    ) {
        self.notifier
            .publish(ChangeEvent::new(kind, operation, board_id, payload));
    }

    async fn locate_column(&self, user_id: UserId, id: ColumnId) -> KanbanResult<BoardId> {
        let mut tx = self.store.begin().await?;
        let owned = guard::owned_column(tx.as_mut(), user_id, id).await?;
        tx.rollback().await?;
        Ok(owned.board.id)
    }

    async fn locate_card(&self, user_id: UserId, id: CardId) -> KanbanResult<BoardId> {
        let mut tx = self.store.begin().await?;
        let owned = guard::owned_card(tx.as_mut(), user_id, id).await?;
        tx.rollback().await?;
        Ok(owned.board.id)
    }

    async fn locate_attachment(&self, user_id: UserId, id: AttachmentId) -> KanbanResult<BoardId> {
        let mut tx = self.store.begin().await?;
        let owned = guard::owned_attachment(tx.as_mut(), user_id, id).await?;
        tx.rollback().await?;
        Ok(owned.board.id)
    }
}

/// The entity resolved inside the transaction must still sit on the board
/// whose lock is held.
fn ensure_scope(kind: EntityKind, locked: BoardId, actual: BoardId) -> KanbanResult<()> {
    if locked == actual {
        Ok(())
    } else {
        Err(KanbanError::Conflict(format!(
            "{} changed board while the request was queued",
            kind.label()
        )))
    }
}

fn debug_assert_dense(positions: impl IntoIterator<Item = Position>) {
    debug_assert!(position::is_dense(positions), "positions lost density");
}

async fn board_view(tx: &mut dyn StoreTransaction, board: Board) -> KanbanResult<BoardView> {
    let mut columns = Vec::new();
    for column in tx.list_columns(board.id).await? {
        let cards = tx.list_active_cards(column.id).await?;
        columns.push(ColumnView { column, cards });
    }
    Ok(BoardView { board, columns })
}

#[async_trait]
impl KanbanOperations for BoardService {
    async fn register_user(&self, input: NewUser) -> KanbanResult<User> {
        let user = User::new(input);
        if user.email.is_empty() {
            return Err(KanbanError::Validation("Email is required".to_string()));
        }

        let mut tx = self.store.begin().await?;
        if tx.find_user_by_email(&user.email).await?.is_some() {
            return Err(KanbanError::Conflict("Email already registered".to_string()));
        }
        tx.insert_user(&user).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> KanbanResult<Option<User>> {
        let mut tx = self.store.begin().await?;
        tx.find_user_by_email(&kanban_domain::user::normalize_email(email))
            .await
    }

    async fn create_board(&self, user_id: UserId, mut input: NewBoard) -> KanbanResult<BoardView> {
        input.title = clean_title(EntityKind::Board, &input.title)?;
        let board = Board::new(user_id, input);

        let mut tx = self.store.begin().await?;
        tx.insert_board(&board).await?;
        let mut columns = Vec::with_capacity(self.config.default_columns.len());
        for (index, title) in self.config.default_columns.iter().enumerate() {
            let column = Column::new(board.id, title.clone(), index as Position);
            tx.insert_column(&column).await?;
            columns.push(ColumnView {
                column,
                cards: Vec::new(),
            });
        }
        tx.commit().await?;

        tracing::info!(board_id = %board.id, columns = columns.len(), "Created board");
        self.publish(
            EntityKind::Board,
            ChangeOperation::Created,
            board.id,
            ChangePayload::Board(board.clone()),
        );
        Ok(BoardView { board, columns })
    }

    async fn list_boards(&self, user_id: UserId) -> KanbanResult<Vec<BoardSummary>> {
        let mut tx = self.store.begin().await?;
        let mut summaries = Vec::new();
        for board in tx.list_boards(user_id).await? {
            let column_count = tx.count_columns(board.id).await?;
            summaries.push(BoardSummary {
                board,
                column_count,
            });
        }
        Ok(summaries)
    }

    async fn get_board(&self, user_id: UserId, id: BoardId) -> KanbanResult<BoardView> {
        let mut tx = self.store.begin().await?;
        let owned = guard::owned_board(tx.as_mut(), user_id, id).await?;
        board_view(tx.as_mut(), owned.board).await
    }

    async fn update_board(
        &self,
        user_id: UserId,
        id: BoardId,
        mut updates: BoardUpdate,
    ) -> KanbanResult<Board> {
        updates.title = updates
            .title
            .map(|title| clean_title(EntityKind::Board, &title))
            .transpose()?;

        let _scope = self.locks.lock(id).await;
        let mut tx = self.store.begin().await?;
        let mut board = guard::owned_board(tx.as_mut(), user_id, id).await?.board;
        board.update(updates);
        tx.update_board(&board).await?;
        tx.commit().await?;

        tracing::info!(board_id = %board.id, "Updated board");
        self.publish(
            EntityKind::Board,
            ChangeOperation::Updated,
            board.id,
            ChangePayload::Board(board.clone()),
        );
        Ok(board)
    }

    async fn delete_board(&self, user_id: UserId, id: BoardId) -> KanbanResult<Removal> {
        let scope = self.locks.lock(id).await;
        let mut tx = self.store.begin().await?;
        guard::owned_board(tx.as_mut(), user_id, id).await?;
        let attachments = tx.delete_board(id).await?;
        tx.commit().await?;
        drop(scope);
        self.locks.forget(id);

        tracing::info!(board_id = %id, attachments = attachments.len(), "Deleted board");
        self.publish(
            EntityKind::Board,
            ChangeOperation::Deleted,
            id,
            ChangePayload::Removed {
                id,
                parent_id: None,
            },
        );
        Ok(Removal { id, attachments })
    }

    async fn create_column(
        &self,
        user_id: UserId,
        board_id: BoardId,
        title: String,
    ) -> KanbanResult<Column> {
        let title = clean_title(EntityKind::Column, &title)?;

        let _scope = self.locks.lock(board_id).await;
        let mut tx = self.store.begin().await?;
        guard::owned_board(tx.as_mut(), user_id, board_id).await?;
        let count = tx.count_columns(board_id).await?;
        let column = Column::new(board_id, title, position::append_position(count));
        tx.insert_column(&column).await?;
        tx.commit().await?;

        tracing::info!(column_id = %column.id, position = column.position, "Created column");
        self.publish(
            EntityKind::Column,
            ChangeOperation::Created,
            board_id,
            ChangePayload::Column(column.clone()),
        );
        Ok(column)
    }

    async fn rename_column(
        &self,
        user_id: UserId,
        id: ColumnId,
        title: String,
    ) -> KanbanResult<Column> {
        let title = clean_title(EntityKind::Column, &title)?;
        let board_id = self.locate_column(user_id, id).await?;

        let _scope = self.locks.lock(board_id).await;
        let mut tx = self.store.begin().await?;
        let owned = guard::owned_column(tx.as_mut(), user_id, id).await?;
        ensure_scope(EntityKind::Column, board_id, owned.board.id)?;
        let mut column = owned.column;
        column.rename(title);
        tx.update_column(&column).await?;
        tx.commit().await?;

        tracing::info!(column_id = %column.id, "Renamed column");
        self.publish(
            EntityKind::Column,
            ChangeOperation::Updated,
            board_id,
            ChangePayload::Column(column.clone()),
        );
        Ok(column)
    }

    async fn move_column(
        &self,
        user_id: UserId,
        id: ColumnId,
        position: Position,
    ) -> KanbanResult<Vec<Column>> {
        ensure_position(position)?;
        let board_id = self.locate_column(user_id, id).await?;

        let _scope = self.locks.lock(board_id).await;
        let mut tx = self.store.begin().await?;
        let owned = guard::owned_column(tx.as_mut(), user_id, id).await?;
        ensure_scope(EntityKind::Column, board_id, owned.board.id)?;

        let siblings = tx.count_columns(board_id).await?.saturating_sub(1);
        let target = position::clamp_target(position, siblings);
        let plan = position::plan_move(
            Slot::new(board_id, owned.column.position),
            Slot::new(board_id, target),
        );
        if plan.is_noop() {
            return tx.list_columns(board_id).await;
        }

        tracing::debug!(column_id = %id, from = owned.column.position, to = target, "Planned column move");
        for scoped in &plan.shifts {
            tx.shift_columns(scoped.scope, scoped.shift).await?;
        }
        tx.set_column_position(id, target).await?;
        let columns = tx.list_columns(board_id).await?;
        debug_assert_dense(columns.iter().map(|c| c.position));
        tx.commit().await?;

        tracing::info!(column_id = %id, position = target, "Moved column");
        self.publish(
            EntityKind::Column,
            ChangeOperation::Reordered,
            board_id,
            ChangePayload::Columns(columns.clone()),
        );
        Ok(columns)
    }

    async fn delete_column(&self, user_id: UserId, id: ColumnId) -> KanbanResult<Removal> {
        let board_id = self.locate_column(user_id, id).await?;

        let _scope = self.locks.lock(board_id).await;
        let mut tx = self.store.begin().await?;
        let owned = guard::owned_column(tx.as_mut(), user_id, id).await?;
        ensure_scope(EntityKind::Column, board_id, owned.board.id)?;
        let attachments = tx.delete_column(id).await?;
        tx.shift_columns(board_id, position::removal_shift(owned.column.position))
            .await?;
        tx.commit().await?;

        tracing::info!(column_id = %id, attachments = attachments.len(), "Deleted column");
        self.publish(
            EntityKind::Column,
            ChangeOperation::Deleted,
            board_id,
            ChangePayload::Removed {
                id,
                parent_id: Some(board_id),
            },
        );
        Ok(Removal { id, attachments })
    }

    async fn reorder_columns(
        &self,
        user_id: UserId,
        board_id: BoardId,
        column_ids: Vec<ColumnId>,
    ) -> KanbanResult<Vec<Column>> {
        let _scope = self.locks.lock(board_id).await;
        let mut tx = self.store.begin().await?;
        guard::owned_board(tx.as_mut(), user_id, board_id).await?;

        let current: Vec<ColumnId> = tx
            .list_columns(board_id)
            .await?
            .iter()
            .map(|c| c.id)
            .collect();
        for (id, position) in position::plan_reorder(&current, &column_ids)? {
            tx.set_column_position(id, position).await?;
        }
        let columns = tx.list_columns(board_id).await?;
        debug_assert_dense(columns.iter().map(|c| c.position));
        tx.commit().await?;

        tracing::info!(board_id = %board_id, columns = columns.len(), "Reordered columns");
        self.publish(
            EntityKind::Column,
            ChangeOperation::Reordered,
            board_id,
            ChangePayload::Columns(columns.clone()),
        );
        Ok(columns)
    }

    async fn create_card(
        &self,
        user_id: UserId,
        column_id: ColumnId,
        mut input: NewCard,
    ) -> KanbanResult<Card> {
        input.title = clean_title(EntityKind::Card, &input.title)?;
        let board_id = self.locate_column(user_id, column_id).await?;

        let _scope = self.locks.lock(board_id).await;
        let mut tx = self.store.begin().await?;
        let owned = guard::owned_column(tx.as_mut(), user_id, column_id).await?;
        ensure_scope(EntityKind::Column, board_id, owned.board.id)?;
        let count = tx.count_active_cards(column_id).await?;
        let card = Card::new(column_id, input, position::append_position(count));
        tx.insert_card(&card).await?;
        tx.commit().await?;

        tracing::info!(card_id = %card.id, position = card.position, "Created card");
        self.publish(
            EntityKind::Card,
            ChangeOperation::Created,
            board_id,
            ChangePayload::Card(card.clone()),
        );
        Ok(card)
    }

    async fn get_card(&self, user_id: UserId, id: CardId) -> KanbanResult<Card> {
        let mut tx = self.store.begin().await?;
        Ok(guard::owned_card(tx.as_mut(), user_id, id).await?.card)
    }

    async fn update_card(
        &self,
        user_id: UserId,
        id: CardId,
        mut updates: CardUpdate,
    ) -> KanbanResult<Card> {
        updates.title = updates
            .title
            .map(|title| clean_title(EntityKind::Card, &title))
            .transpose()?;
        let board_id = self.locate_card(user_id, id).await?;

        let _scope = self.locks.lock(board_id).await;
        let mut tx = self.store.begin().await?;
        let owned = guard::owned_card(tx.as_mut(), user_id, id).await?;
        ensure_scope(EntityKind::Card, board_id, owned.board.id)?;
        let mut card = owned.card;
        card.update(updates);
        tx.update_card(&card).await?;
        tx.commit().await?;

        tracing::info!(card_id = %card.id, "Updated card");
        self.publish(
            EntityKind::Card,
            ChangeOperation::Updated,
            board_id,
            ChangePayload::Card(card.clone()),
        );
        Ok(card)
    }

    async fn delete_card(&self, user_id: UserId, id: CardId) -> KanbanResult<Removal> {
        let board_id = self.locate_card(user_id, id).await?;

        let _scope = self.locks.lock(board_id).await;
        let mut tx = self.store.begin().await?;
        let owned = guard::owned_card(tx.as_mut(), user_id, id).await?;
        ensure_scope(EntityKind::Card, board_id, owned.board.id)?;
        let card = owned.card;
        let attachments = tx.delete_card(id).await?;
        if card.is_active() {
            tx.shift_cards(card.column_id, position::removal_shift(card.position))
                .await?;
        }
        tx.commit().await?;

        tracing::info!(card_id = %id, attachments = attachments.len(), "Deleted card");
        self.publish(
            EntityKind::Card,
            ChangeOperation::Deleted,
            board_id,
            ChangePayload::Removed {
                id,
                parent_id: Some(card.column_id),
            },
        );
        Ok(Removal { id, attachments })
    }

    async fn move_card(
        &self,
        user_id: UserId,
        id: CardId,
        column_id: ColumnId,
        position: Position,
    ) -> KanbanResult<CardMove> {
        ensure_position(position)?;
        let from_board = self.locate_card(user_id, id).await?;
        let to_board = self.locate_column(user_id, column_id).await?;

        let _scope = self.locks.lock_all(&[from_board, to_board]).await;
        let mut tx = self.store.begin().await?;
        let owned = guard::owned_card(tx.as_mut(), user_id, id).await?;
        ensure_scope(EntityKind::Card, from_board, owned.board.id)?;
        let target = guard::owned_column(tx.as_mut(), user_id, column_id).await?;
        ensure_scope(EntityKind::Column, to_board, target.board.id)?;

        let mut card = owned.card;
        if !card.is_active() {
            return Err(KanbanError::InvalidState(
                "Archived cards cannot be moved".to_string(),
            ));
        }
        let from_column_id = card.column_id;

        let mut siblings = tx.count_active_cards(column_id).await?;
        if from_column_id == column_id {
            siblings = siblings.saturating_sub(1);
        }
        let target_position = position::clamp_target(position, siblings);
        let plan = position::plan_move(
            Slot::new(from_column_id, card.position),
            Slot::new(column_id, target_position),
        );
        if plan.is_noop() {
            return Ok(CardMove {
                card,
                from_column_id,
                to_column_id: column_id,
            });
        }

        tracing::debug!(
            card_id = %id,
            from = card.position,
            to = target_position,
            shifts = plan.shifts.len(),
            "Planned card move"
        );
        for scoped in &plan.shifts {
            tx.shift_cards(scoped.scope, scoped.shift).await?;
        }
        card.move_to(column_id, target_position);
        tx.update_card(&card).await?;
        tx.commit().await?;

        tracing::info!(card_id = %id, column_id = %column_id, position = target_position, "Moved card");
        let moved = CardMove {
            card,
            from_column_id,
            to_column_id: column_id,
        };
        let payload = ChangePayload::CardMoved {
            card: moved.card.clone(),
            from_column_id,
            to_column_id: column_id,
        };
        if from_board != to_board {
            self.publish(
                EntityKind::Card,
                ChangeOperation::Moved,
                from_board,
                payload.clone(),
            );
        }
        self.publish(EntityKind::Card, ChangeOperation::Moved, to_board, payload);
        Ok(moved)
    }

    async fn reorder_cards(
        &self,
        user_id: UserId,
        column_id: ColumnId,
        card_ids: Vec<CardId>,
    ) -> KanbanResult<Vec<Card>> {
        let board_id = self.locate_column(user_id, column_id).await?;

        let _scope = self.locks.lock(board_id).await;
        let mut tx = self.store.begin().await?;
        let owned = guard::owned_column(tx.as_mut(), user_id, column_id).await?;
        ensure_scope(EntityKind::Column, board_id, owned.board.id)?;

        let current: Vec<CardId> = tx
            .list_active_cards(column_id)
            .await?
            .iter()
            .map(|c| c.id)
            .collect();
        for (id, position) in position::plan_reorder(&current, &card_ids)? {
            tx.set_card_position(id, position).await?;
        }
        let cards = tx.list_active_cards(column_id).await?;
        debug_assert_dense(cards.iter().map(|c| c.position));
        tx.commit().await?;

        tracing::info!(column_id = %column_id, cards = cards.len(), "Reordered cards");
        self.publish(
            EntityKind::Card,
            ChangeOperation::Reordered,
            board_id,
            ChangePayload::Cards(cards.clone()),
        );
        Ok(cards)
    }

    async fn archive_card(&self, user_id: UserId, id: CardId) -> KanbanResult<Card> {
        let board_id = self.locate_card(user_id, id).await?;

        let _scope = self.locks.lock(board_id).await;
        let mut tx = self.store.begin().await?;
        let owned = guard::owned_card(tx.as_mut(), user_id, id).await?;
        ensure_scope(EntityKind::Card, board_id, owned.board.id)?;
        let mut card = owned.card;
        card.archive(Utc::now())?;
        tx.update_card(&card).await?;
        tx.shift_cards(card.column_id, position::removal_shift(card.position))
            .await?;
        tx.commit().await?;

        tracing::info!(card_id = %id, "Archived card");
        self.publish(
            EntityKind::Card,
            ChangeOperation::Archived,
            board_id,
            ChangePayload::Card(card.clone()),
        );
        Ok(card)
    }

    async fn restore_card(&self, user_id: UserId, id: CardId) -> KanbanResult<Card> {
        let board_id = self.locate_card(user_id, id).await?;

        let _scope = self.locks.lock(board_id).await;
        let mut tx = self.store.begin().await?;
        let owned = guard::owned_card(tx.as_mut(), user_id, id).await?;
        ensure_scope(EntityKind::Card, board_id, owned.board.id)?;
        let mut card = owned.card;
        card.ensure_archived()?;
        let count = tx.count_active_cards(card.column_id).await?;
        card.restore(position::append_position(count))?;
        tx.update_card(&card).await?;
        tx.commit().await?;

        tracing::info!(card_id = %id, position = card.position, "Restored card");
        self.publish(
            EntityKind::Card,
            ChangeOperation::Restored,
            board_id,
            ChangePayload::Card(card.clone()),
        );
        Ok(card)
    }

    async fn delete_archived_card(&self, user_id: UserId, id: CardId) -> KanbanResult<Removal> {
        let board_id = self.locate_card(user_id, id).await?;

        let _scope = self.locks.lock(board_id).await;
        let mut tx = self.store.begin().await?;
        let owned = guard::owned_card(tx.as_mut(), user_id, id).await?;
        ensure_scope(EntityKind::Card, board_id, owned.board.id)?;
        owned.card.ensure_archived()?;
        let attachments = tx.delete_card(id).await?;
        tx.commit().await?;

        tracing::info!(card_id = %id, "Permanently deleted archived card");
        self.publish(
            EntityKind::Card,
            ChangeOperation::Deleted,
            board_id,
            ChangePayload::Removed {
                id,
                parent_id: Some(owned.card.column_id),
            },
        );
        Ok(Removal { id, attachments })
    }

    async fn list_archived_cards(
        &self,
        user_id: UserId,
        board_id: BoardId,
    ) -> KanbanResult<Vec<Card>> {
        let mut tx = self.store.begin().await?;
        guard::owned_board(tx.as_mut(), user_id, board_id).await?;
        tx.list_archived_cards(board_id).await
    }

    async fn add_attachment(
        &self,
        user_id: UserId,
        card_id: CardId,
        input: NewAttachment,
    ) -> KanbanResult<Attachment> {
        input.validate()?;
        let board_id = self.locate_card(user_id, card_id).await?;

        let _scope = self.locks.lock(board_id).await;
        let mut tx = self.store.begin().await?;
        let owned = guard::owned_card(tx.as_mut(), user_id, card_id).await?;
        ensure_scope(EntityKind::Card, board_id, owned.board.id)?;
        let attachment = Attachment::new(card_id, user_id, input);
        tx.insert_attachment(&attachment).await?;
        tx.commit().await?;

        tracing::info!(attachment_id = %attachment.id, size = attachment.size, "Added attachment");
        self.publish(
            EntityKind::Attachment,
            ChangeOperation::Created,
            board_id,
            ChangePayload::Attachment(attachment.clone()),
        );
        Ok(attachment)
    }

    async fn list_attachments(
        &self,
        user_id: UserId,
        card_id: CardId,
    ) -> KanbanResult<Vec<Attachment>> {
        let mut tx = self.store.begin().await?;
        guard::owned_card(tx.as_mut(), user_id, card_id).await?;
        tx.list_attachments(card_id).await
    }

    async fn get_attachment(&self, user_id: UserId, id: AttachmentId) -> KanbanResult<Attachment> {
        let mut tx = self.store.begin().await?;
        Ok(guard::owned_attachment(tx.as_mut(), user_id, id)
            .await?
            .attachment)
    }

    async fn delete_attachment(
        &self,
        user_id: UserId,
        id: AttachmentId,
    ) -> KanbanResult<Attachment> {
        let board_id = self.locate_attachment(user_id, id).await?;

        let _scope = self.locks.lock(board_id).await;
        let mut tx = self.store.begin().await?;
        let owned = guard::owned_attachment(tx.as_mut(), user_id, id).await?;
        ensure_scope(EntityKind::Attachment, board_id, owned.board.id)?;
        tx.delete_attachment(id).await?;
        tx.commit().await?;

        tracing::info!(attachment_id = %id, "Deleted attachment");
        self.publish(
            EntityKind::Attachment,
            ChangeOperation::Deleted,
            board_id,
            ChangePayload::Removed {
                id,
                parent_id: Some(owned.card.id),
            },
        );
        Ok(owned.attachment)
    }
}
