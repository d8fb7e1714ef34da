//! Whole-database state held by the memory store, and the journal of
//! writes a transaction replays onto it at commit.

use kanban_core::{KanbanError, KanbanResult, OptionExt};
use kanban_domain::{
    Attachment, AttachmentId, Board, BoardId, Card, CardId, Column, ColumnId, Position, Shift,
    User, UserId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub users: BTreeMap<UserId, User>,
    #[serde(default)]
    pub boards: BTreeMap<BoardId, Board>,
    #[serde(default)]
    pub columns: BTreeMap<ColumnId, Column>,
    #[serde(default)]
    pub cards: BTreeMap<CardId, Card>,
    #[serde(default)]
    pub attachments: BTreeMap<AttachmentId, Attachment>,
}

/// One recorded write.
#[derive(Debug, Clone)]
pub(crate) enum Write {
    InsertUser(User),
    InsertBoard(Board),
    UpdateBoard(Board),
    DeleteBoard(BoardId),
    InsertColumn(Column),
    UpdateColumn(Column),
    SetColumnPosition(ColumnId, Position),
    ShiftColumns(BoardId, Shift),
    DeleteColumn(ColumnId),
    InsertCard(Card),
    UpdateCard(Card),
    SetCardPosition(CardId, Position),
    ShiftCards(ColumnId, Shift),
    DeleteCard(CardId),
    InsertAttachment(Attachment),
    DeleteAttachment(AttachmentId),
}

/// What a write did, for the caller that issued it.
#[derive(Debug, Default)]
pub(crate) struct Applied {
    pub shifted: u64,
    pub removed: Vec<Attachment>,
}

impl StoreState {
    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|u| u.email == email)
    }

    pub fn boards_of(&self, owner_id: UserId) -> Vec<Board> {
        let mut boards: Vec<Board> = self
            .boards
            .values()
            .filter(|b| b.owner_id == owner_id)
            .cloned()
            .collect();
        boards.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        boards
    }

    pub fn columns_of(&self, board_id: BoardId) -> Vec<Column> {
        let mut columns: Vec<Column> = self
            .columns
            .values()
            .filter(|c| c.board_id == board_id)
            .cloned()
            .collect();
        columns.sort_by_key(|c| c.position);
        columns
    }

    pub fn active_cards_of(&self, column_id: ColumnId) -> Vec<Card> {
        let mut cards: Vec<Card> = self
            .cards
            .values()
            .filter(|c| c.column_id == column_id && c.is_active())
            .cloned()
            .collect();
        cards.sort_by_key(|c| c.position);
        cards
    }

    pub fn archived_cards_of(&self, board_id: BoardId) -> Vec<Card> {
        let mut cards: Vec<Card> = self
            .cards
            .values()
            .filter(|c| {
                c.archived
                    && self
                        .columns
                        .get(&c.column_id)
                        .is_some_and(|col| col.board_id == board_id)
            })
            .cloned()
            .collect();
        cards.sort_by(|a, b| b.archived_at.cmp(&a.archived_at));
        cards
    }

    pub fn attachments_of(&self, card_id: CardId) -> Vec<Attachment> {
        let mut attachments: Vec<Attachment> = self
            .attachments
            .values()
            .filter(|a| a.card_id == card_id)
            .cloned()
            .collect();
        attachments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        attachments
    }

    pub(crate) fn apply(&mut self, write: &Write) -> KanbanResult<Applied> {
        let mut applied = Applied::default();
        match write {
            Write::InsertUser(user) => {
                if self.user_by_email(&user.email).is_some() {
                    return Err(KanbanError::Conflict("Email already registered".to_string()));
                }
                insert_new(&mut self.users, user.id, user.clone(), "User")?;
            }
            Write::InsertBoard(board) => {
                insert_new(&mut self.boards, board.id, board.clone(), "Board")?;
            }
            Write::UpdateBoard(board) => {
                *self.boards.get_mut(&board.id).or_not_found("Board")? = board.clone();
            }
            Write::DeleteBoard(id) => {
                self.boards.remove(id).or_not_found("Board")?;
                let column_ids: Vec<ColumnId> = self
                    .columns
                    .values()
                    .filter(|c| c.board_id == *id)
                    .map(|c| c.id)
                    .collect();
                for column_id in column_ids {
                    applied.removed.extend(self.remove_column(column_id)?);
                }
            }
            Write::InsertColumn(column) => {
                self.boards.get(&column.board_id).or_not_found("Board")?;
                insert_new(&mut self.columns, column.id, column.clone(), "Column")?;
            }
            Write::UpdateColumn(column) => {
                *self.columns.get_mut(&column.id).or_not_found("Column")? = column.clone();
            }
            Write::SetColumnPosition(id, position) => {
                self.columns.get_mut(id).or_not_found("Column")?.position = *position;
            }
            Write::ShiftColumns(board_id, shift) => {
                for column in self.columns.values_mut() {
                    if column.board_id == *board_id && shift.range.contains(column.position) {
                        column.position = shift.apply(column.position);
                        applied.shifted += 1;
                    }
                }
            }
            Write::DeleteColumn(id) => {
                applied.removed = self.remove_column(*id)?;
            }
            Write::InsertCard(card) => {
                self.columns.get(&card.column_id).or_not_found("Column")?;
                insert_new(&mut self.cards, card.id, card.clone(), "Card")?;
            }
            Write::UpdateCard(card) => {
                self.columns.get(&card.column_id).or_not_found("Column")?;
                *self.cards.get_mut(&card.id).or_not_found("Card")? = card.clone();
            }
            Write::SetCardPosition(id, position) => {
                self.cards.get_mut(id).or_not_found("Card")?.position = *position;
            }
            Write::ShiftCards(column_id, shift) => {
                for card in self.cards.values_mut() {
                    if card.column_id == *column_id
                        && card.is_active()
                        && shift.range.contains(card.position)
                    {
                        card.position = shift.apply(card.position);
                        applied.shifted += 1;
                    }
                }
            }
            Write::DeleteCard(id) => {
                applied.removed = self.remove_card(*id)?;
            }
            Write::InsertAttachment(attachment) => {
                self.cards.get(&attachment.card_id).or_not_found("Card")?;
                insert_new(
                    &mut self.attachments,
                    attachment.id,
                    attachment.clone(),
                    "Attachment",
                )?;
            }
            Write::DeleteAttachment(id) => {
                self.attachments.remove(id).or_not_found("Attachment")?;
            }
        }
        Ok(applied)
    }

    fn remove_column(&mut self, id: ColumnId) -> KanbanResult<Vec<Attachment>> {
        self.columns.remove(&id).or_not_found("Column")?;
        let card_ids: Vec<CardId> = self
            .cards
            .values()
            .filter(|c| c.column_id == id)
            .map(|c| c.id)
            .collect();
        let mut removed = Vec::new();
        for card_id in card_ids {
            removed.extend(self.remove_card(card_id)?);
        }
        Ok(removed)
    }

    fn remove_card(&mut self, id: CardId) -> KanbanResult<Vec<Attachment>> {
        self.cards.remove(&id).or_not_found("Card")?;
        let (removed, kept): (BTreeMap<_, _>, BTreeMap<_, _>) =
            std::mem::take(&mut self.attachments)
                .into_iter()
                .partition(|(_, a)| a.card_id == id);
        self.attachments = kept;
        Ok(removed.into_values().collect())
    }
}

fn insert_new<K: Ord, V>(
    table: &mut BTreeMap<K, V>,
    key: K,
    value: V,
    kind: &str,
) -> KanbanResult<()> {
    if table.contains_key(&key) {
        return Err(KanbanError::Conflict(format!("{} already exists", kind)));
    }
    table.insert(key, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanban_domain::{position, NewAttachment, NewBoard, NewCard};
    use uuid::Uuid;

    fn seeded() -> (StoreState, Board, Column, Card) {
        let mut state = StoreState::default();
        let board = Board::new(Uuid::new_v4(), NewBoard::default());
        let column = Column::new(board.id, "To Do".to_string(), 0);
        let card = Card::new(column.id, NewCard::titled("First"), 0);
        state.apply(&Write::InsertBoard(board.clone())).unwrap();
        state.apply(&Write::InsertColumn(column.clone())).unwrap();
        state.apply(&Write::InsertCard(card.clone())).unwrap();
        (state, board, column, card)
    }

    #[test]
    fn test_board_delete_cascades_and_returns_attachments() {
        let (mut state, board, _, card) = seeded();
        let attachment = Attachment::new(
            card.id,
            board.owner_id,
            NewAttachment {
                original_name: "notes.txt".to_string(),
                mime_type: "text/plain".to_string(),
                size: 12,
            },
        );
        state
            .apply(&Write::InsertAttachment(attachment.clone()))
            .unwrap();

        let applied = state.apply(&Write::DeleteBoard(board.id)).unwrap();

        assert_eq!(applied.removed, vec![attachment]);
        assert!(state.columns.is_empty());
        assert!(state.cards.is_empty());
        assert!(state.attachments.is_empty());
    }

    #[test]
    fn test_card_shift_skips_archived_cards() {
        let (mut state, _, column, mut card) = seeded();
        let second = Card::new(column.id, NewCard::titled("Second"), 1);
        state.apply(&Write::InsertCard(second.clone())).unwrap();
        card.archive(chrono::Utc::now()).unwrap();
        state.apply(&Write::UpdateCard(card.clone())).unwrap();

        let applied = state
            .apply(&Write::ShiftCards(column.id, position::removal_shift(0)))
            .unwrap();

        assert_eq!(applied.shifted, 1);
        assert_eq!(state.cards[&second.id].position, 0);
        assert_eq!(state.cards[&card.id].position, 0);
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let mut state = StoreState::default();
        let input = kanban_domain::NewUser {
            email: "ada@example.com".to_string(),
            password_hash: "x".to_string(),
            first_name: None,
            last_name: None,
        };
        state
            .apply(&Write::InsertUser(User::new(input.clone())))
            .unwrap();
        assert!(matches!(
            state.apply(&Write::InsertUser(User::new(input))),
            Err(KanbanError::Conflict(_))
        ));
    }

    #[test]
    fn test_update_of_missing_row_is_not_found() {
        let (mut state, _, _, card) = seeded();
        state.apply(&Write::DeleteCard(card.id)).unwrap();
        assert!(matches!(
            state.apply(&Write::SetCardPosition(card.id, 3)),
            Err(KanbanError::NotFound(_))
        ));
    }
}
