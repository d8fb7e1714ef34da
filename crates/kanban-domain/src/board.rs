use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Card, Column, FieldUpdate, UserId};

pub type BoardId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub title: String,
    pub owner_id: UserId,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewBoard {
    pub title: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BoardUpdate {
    pub title: Option<String>,
    pub icon: FieldUpdate<String>,
    pub favorite: Option<bool>,
}

impl Board {
    pub fn new(owner_id: UserId, input: NewBoard) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            owner_id,
            icon: input.icon,
            favorite: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    pub fn update(&mut self, updates: BoardUpdate) {
        if let Some(title) = updates.title {
            self.title = title;
        }
        updates.icon.apply_to(&mut self.icon);
        if let Some(favorite) = updates.favorite {
            self.favorite = favorite;
        }
        self.updated_at = Utc::now();
    }
}

/// Board list entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSummary {
    #[serde(flatten)]
    pub board: Board,
    pub column_count: usize,
}

/// A column with its active cards in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnView {
    #[serde(flatten)]
    pub column: Column,
    pub cards: Vec<Card>,
}

/// A board with its columns in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardView {
    #[serde(flatten)]
    pub board: Board,
    pub columns: Vec<ColumnView>,
}

impl BoardView {
    pub fn column(&self, title: &str) -> Option<&ColumnView> {
        self.columns.iter().find(|c| c.column.title == title)
    }
}
