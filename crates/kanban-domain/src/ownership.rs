//! Ownership rules.
//!
//! A user may only touch entities under a board they own. Lookups that fail
//! and lookups that resolve to someone else's board produce the same
//! NotFound error, so callers cannot discover ids they do not own.

use kanban_core::{KanbanError, KanbanResult};

use crate::{Attachment, Board, Card, Column, EntityKind, UserId};

/// Resolved board known to belong to the acting user.
#[derive(Debug, Clone)]
pub struct OwnedBoard {
    pub board: Board,
}

#[derive(Debug, Clone)]
pub struct OwnedColumn {
    pub column: Column,
    pub board: Board,
}

#[derive(Debug, Clone)]
pub struct OwnedCard {
    pub card: Card,
    pub column: Column,
    pub board: Board,
}

#[derive(Debug, Clone)]
pub struct OwnedAttachment {
    pub attachment: Attachment,
    pub card: Card,
    pub column: Column,
    pub board: Board,
}

/// Checks the top of an ownership chain. `kind` names the entity the caller
/// asked for, which is what the error reports.
pub fn authorize(board: &Board, user_id: UserId, kind: EntityKind) -> KanbanResult<()> {
    if board.is_owned_by(user_id) {
        Ok(())
    } else {
        Err(KanbanError::not_found(kind.label()))
    }
}

impl OwnedBoard {
    pub fn check(board: Option<Board>, user_id: UserId) -> KanbanResult<Self> {
        let board = board.ok_or_else(|| KanbanError::not_found(EntityKind::Board.label()))?;
        authorize(&board, user_id, EntityKind::Board)?;
        Ok(Self { board })
    }
}

impl OwnedColumn {
    pub fn check(column: Column, board: Option<Board>, user_id: UserId) -> KanbanResult<Self> {
        let board = linked(board, EntityKind::Column)?;
        if column.board_id != board.id {
            return Err(broken_chain(EntityKind::Column));
        }
        authorize(&board, user_id, EntityKind::Column)?;
        Ok(Self { column, board })
    }
}

impl OwnedCard {
    pub fn check(
        card: Card,
        column: Option<Column>,
        board: Option<Board>,
        user_id: UserId,
    ) -> KanbanResult<Self> {
        let column = linked(column, EntityKind::Card)?;
        let board = linked(board, EntityKind::Card)?;
        if card.column_id != column.id || column.board_id != board.id {
            return Err(broken_chain(EntityKind::Card));
        }
        authorize(&board, user_id, EntityKind::Card)?;
        Ok(Self {
            card,
            column,
            board,
        })
    }
}

impl OwnedAttachment {
    pub fn check(attachment: Attachment, owner: OwnedCard) -> KanbanResult<Self> {
        if attachment.card_id != owner.card.id {
            return Err(broken_chain(EntityKind::Attachment));
        }
        Ok(Self {
            attachment,
            card: owner.card,
            column: owner.column,
            board: owner.board,
        })
    }
}

/// A missing parent means the child is unreachable; report the child.
fn linked<T>(parent: Option<T>, kind: EntityKind) -> KanbanResult<T> {
    parent.ok_or_else(|| KanbanError::not_found(kind.label()))
}

fn broken_chain(kind: EntityKind) -> KanbanError {
    KanbanError::Internal(format!("{} ownership chain is inconsistent", kind))
}
