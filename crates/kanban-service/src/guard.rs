//! Resolves an entity's ownership chain inside a transaction.

use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    AttachmentId, BoardId, CardId, ColumnId, EntityKind, OwnedAttachment, OwnedBoard, OwnedCard,
    OwnedColumn, UserId,
};
use kanban_persistence::StoreTransaction;

pub async fn owned_board(
    tx: &mut dyn StoreTransaction,
    user_id: UserId,
    board_id: BoardId,
) -> KanbanResult<OwnedBoard> {
    let board = tx.find_board(board_id).await?;
    OwnedBoard::check(board, user_id).inspect_err(|_| rejected(EntityKind::Board, board_id))
}

pub async fn owned_column(
    tx: &mut dyn StoreTransaction,
    user_id: UserId,
    column_id: ColumnId,
) -> KanbanResult<OwnedColumn> {
    let Some(column) = tx.find_column(column_id).await? else {
        rejected(EntityKind::Column, column_id);
        return Err(KanbanError::not_found(EntityKind::Column.label()));
    };
    let board = tx.find_board(column.board_id).await?;
    OwnedColumn::check(column, board, user_id)
        .inspect_err(|_| rejected(EntityKind::Column, column_id))
}

pub async fn owned_card(
    tx: &mut dyn StoreTransaction,
    user_id: UserId,
    card_id: CardId,
) -> KanbanResult<OwnedCard> {
    let Some(card) = tx.find_card(card_id).await? else {
        rejected(EntityKind::Card, card_id);
        return Err(KanbanError::not_found(EntityKind::Card.label()));
    };
    let column = tx.find_column(card.column_id).await?;
    let board = match &column {
        Some(column) => tx.find_board(column.board_id).await?,
        None => None,
    };
    OwnedCard::check(card, column, board, user_id)
        .inspect_err(|_| rejected(EntityKind::Card, card_id))
}

pub async fn owned_attachment(
    tx: &mut dyn StoreTransaction,
    user_id: UserId,
    attachment_id: AttachmentId,
) -> KanbanResult<OwnedAttachment> {
    let Some(attachment) = tx.find_attachment(attachment_id).await? else {
        rejected(EntityKind::Attachment, attachment_id);
        return Err(KanbanError::not_found(EntityKind::Attachment.label()));
    };
    let owner = owned_card(tx, user_id, attachment.card_id)
        .await
        .map_err(|e| match e {
            KanbanError::NotFound(_) => KanbanError::not_found(EntityKind::Attachment.label()),
            other => other,
        })?;
    OwnedAttachment::check(attachment, owner)
}

// Debug level only: ids of rejected lookups stay out of production logs.
fn rejected(kind: EntityKind, id: uuid::Uuid) {
    tracing::debug!(%id, "{} lookup rejected", kind);
}
