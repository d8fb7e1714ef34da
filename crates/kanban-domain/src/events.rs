//! Facts published to live clients after a mutation commits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Attachment, Board, BoardId, Card, Column, ColumnId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Board,
    Column,
    Card,
    Attachment,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Board => "board",
            Self::Column => "column",
            Self::Card => "card",
            Self::Attachment => "attachment",
        }
    }

    /// Capitalised name used in NotFound messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Board => "Board",
            Self::Column => "Column",
            Self::Card => "Card",
            Self::Attachment => "Attachment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    Created,
    Updated,
    Deleted,
    Moved,
    Reordered,
    Archived,
    Restored,
}

impl ChangeOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Moved => "moved",
            Self::Reordered => "reordered",
            Self::Archived => "archived",
            Self::Restored => "restored",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChangePayload {
    Board(Board),
    Column(Column),
    Columns(Vec<Column>),
    Card(Card),
    Cards(Vec<Card>),
    CardMoved {
        card: Card,
        from_column_id: ColumnId,
        to_column_id: ColumnId,
    },
    Attachment(Attachment),
    Removed {
        id: Uuid,
        parent_id: Option<Uuid>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: EntityKind,
    pub operation: ChangeOperation,
    pub board_id: BoardId,
    pub payload: ChangePayload,
    pub occurred_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(
        kind: EntityKind,
        operation: ChangeOperation,
        board_id: BoardId,
        payload: ChangePayload,
    ) -> Self {
        Self {
            kind,
            operation,
            board_id,
            payload,
            occurred_at: Utc::now(),
        }
    }

    /// Transport event name, e.g. `card:moved`. Card reorders are a
    /// collection event and use the plural `cards:reordered`.
    pub fn event_name(&self) -> String {
        match (self.kind, self.operation) {
            (EntityKind::Card, ChangeOperation::Reordered) => "cards:reordered".to_string(),
            (kind, operation) => format!("{}:{}", kind, operation.as_str()),
        }
    }

    /// Room the event is fanned out to.
    pub fn room(&self) -> String {
        format!("board:{}", self.board_id)
    }
}

/// Receives committed changes. Implementations must not block: they are
/// called on the request path right after commit.
pub trait ChangeNotifier: Send + Sync {
    fn publish(&self, event: ChangeEvent);
}
