use chrono::{DateTime, Utc};
use kanban_core::{KanbanError, KanbanResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::column::ColumnId;
use crate::position::Position;
use crate::FieldUpdate;

pub type CardId = Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl CardPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for CardPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardPriority {
    type Err = KanbanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            other => Err(KanbanError::Validation(format!(
                "Unknown priority: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub column_id: ColumnId,
    pub title: String,
    pub description: Option<String>,
    pub priority: CardPriority,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub deadline: Option<DateTime<Utc>>,
    /// Display slot among the column's active cards. Frozen while archived
    /// and never read until the card is restored.
    pub position: Position,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCard {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<CardPriority>,
    pub tags: BTreeSet<String>,
    pub deadline: Option<DateTime<Utc>>,
}

impl NewCard {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CardUpdate {
    pub title: Option<String>,
    pub description: FieldUpdate<String>,
    pub priority: Option<CardPriority>,
    pub tags: Option<BTreeSet<String>>,
    pub deadline: FieldUpdate<DateTime<Utc>>,
}

impl Card {
    pub fn new(column_id: ColumnId, input: NewCard, position: Position) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            column_id,
            title: input.title,
            description: input.description,
            priority: input.priority.unwrap_or_default(),
            tags: input.tags,
            deadline: input.deadline,
            position,
            archived: false,
            archived_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.archived
    }

    pub fn update(&mut self, updates: CardUpdate) {
        if let Some(title) = updates.title {
            self.title = title;
        }
        updates.description.apply_to(&mut self.description);
        if let Some(priority) = updates.priority {
            self.priority = priority;
        }
        if let Some(tags) = updates.tags {
            self.tags = tags;
        }
        updates.deadline.apply_to(&mut self.deadline);
        self.updated_at = Utc::now();
    }

    pub fn move_to(&mut self, column_id: ColumnId, position: Position) {
        self.column_id = column_id;
        self.position = position;
        self.updated_at = Utc::now();
    }

    /// Active → Archived. The position is kept as it was.
    pub fn archive(&mut self, at: DateTime<Utc>) -> KanbanResult<()> {
        if self.archived {
            return Err(KanbanError::InvalidState(
                "Card is already archived".to_string(),
            ));
        }
        self.archived = true;
        self.archived_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    /// Archived → Active at the given slot.
    pub fn restore(&mut self, position: Position) -> KanbanResult<()> {
        self.ensure_archived()?;
        self.archived = false;
        self.archived_at = None;
        self.position = position;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn ensure_archived(&self) -> KanbanResult<()> {
        if self.archived {
            Ok(())
        } else {
            Err(KanbanError::InvalidState("Card is not archived".to_string()))
        }
    }
}
