use crate::traits::{KanbanStore, StoreTransaction};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    Attachment, AttachmentId, Board, BoardId, Card, CardId, CardPriority, Column, ColumnId,
    Position, Shift, User, UserId,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite, Transaction};
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../schema.sql");

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed store. Each [`SqliteTransaction`] wraps one database
/// transaction; cascades are left to the schema's foreign keys.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn open(path: impl AsRef<Path>) -> KanbanResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        Self::init(pool).await
    }

    /// Private in-memory database. A single pooled connection keeps it alive.
    pub async fn in_memory() -> KanbanResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(db_err)?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        Self::init(pool).await
    }

    async fn init(pool: Pool<Sqlite>) -> KanbanResult<Self> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await.map_err(db_err)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl KanbanStore for SqliteStore {
    async fn begin(&self) -> KanbanResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await.map_err(db_err)?;
        Ok(Box::new(SqliteTransaction { tx }))
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl SqliteTransaction {
    async fn attachments_where(
        &mut self,
        filter: &str,
        id: Uuid,
    ) -> KanbanResult<Vec<Attachment>> {
        let sql = format!(
            "SELECT a.* FROM attachments a
             JOIN cards c ON c.id = a.card_id
             JOIN columns col ON col.id = c.column_id
             WHERE {} = ?",
            filter
        );
        sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?
            .iter()
            .map(row_to_attachment)
            .collect()
    }
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn insert_user(&mut self, user: &User) -> KanbanResult<()> {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(timestamp(&user.created_at))
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_user_by_email(&mut self, email: &str) -> KanbanResult<Option<User>> {
        sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?
            .as_ref()
            .map(row_to_user)
            .transpose()
    }

    async fn find_board(&mut self, id: BoardId) -> KanbanResult<Option<Board>> {
        sqlx::query("SELECT * FROM boards WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?
            .as_ref()
            .map(row_to_board)
            .transpose()
    }

    async fn list_boards(&mut self, owner_id: UserId) -> KanbanResult<Vec<Board>> {
        sqlx::query("SELECT * FROM boards WHERE owner_id = ? ORDER BY created_at DESC")
            .bind(owner_id.to_string())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?
            .iter()
            .map(row_to_board)
            .collect()
    }

    async fn insert_board(&mut self, board: &Board) -> KanbanResult<()> {
        sqlx::query(
            "INSERT INTO boards (id, title, owner_id, icon, favorite, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(board.id.to_string())
        .bind(&board.title)
        .bind(board.owner_id.to_string())
        .bind(&board.icon)
        .bind(board.favorite)
        .bind(timestamp(&board.created_at))
        .bind(timestamp(&board.updated_at))
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_board(&mut self, board: &Board) -> KanbanResult<()> {
        let result = sqlx::query(
            "UPDATE boards SET title = ?, icon = ?, favorite = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&board.title)
        .bind(&board.icon)
        .bind(board.favorite)
        .bind(timestamp(&board.updated_at))
        .bind(board.id.to_string())
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        expect_row(result.rows_affected(), "Board")
    }

    async fn delete_board(&mut self, id: BoardId) -> KanbanResult<Vec<Attachment>> {
        let removed = self.attachments_where("col.board_id", id).await?;
        let result = sqlx::query("DELETE FROM boards WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        expect_row(result.rows_affected(), "Board")?;
        Ok(removed)
    }

    async fn find_column(&mut self, id: ColumnId) -> KanbanResult<Option<Column>> {
        sqlx::query("SELECT * FROM columns WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?
            .as_ref()
            .map(row_to_column)
            .transpose()
    }

    async fn list_columns(&mut self, board_id: BoardId) -> KanbanResult<Vec<Column>> {
        sqlx::query("SELECT * FROM columns WHERE board_id = ? ORDER BY position ASC")
            .bind(board_id.to_string())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?
            .iter()
            .map(row_to_column)
            .collect()
    }

    async fn count_columns(&mut self, board_id: BoardId) -> KanbanResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM columns WHERE board_id = ?")
            .bind(board_id.to_string())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(count as usize)
    }

    async fn insert_column(&mut self, column: &Column) -> KanbanResult<()> {
        sqlx::query(
            "INSERT INTO columns (id, board_id, title, position, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(column.id.to_string())
        .bind(column.board_id.to_string())
        .bind(&column.title)
        .bind(column.position)
        .bind(timestamp(&column.created_at))
        .bind(timestamp(&column.updated_at))
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_column(&mut self, column: &Column) -> KanbanResult<()> {
        let result = sqlx::query(
            "UPDATE columns SET title = ?, position = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&column.title)
        .bind(column.position)
        .bind(timestamp(&column.updated_at))
        .bind(column.id.to_string())
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        expect_row(result.rows_affected(), "Column")
    }

    async fn set_column_position(&mut self, id: ColumnId, position: Position) -> KanbanResult<()> {
        let result = sqlx::query("UPDATE columns SET position = ?, updated_at = ? WHERE id = ?")
            .bind(position)
            .bind(timestamp(&Utc::now()))
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        expect_row(result.rows_affected(), "Column")
    }

    async fn shift_columns(&mut self, board_id: BoardId, shift: Shift) -> KanbanResult<u64> {
        let result = sqlx::query(
            "UPDATE columns SET position = position + ?
             WHERE board_id = ? AND position >= ? AND (? IS NULL OR position <= ?)",
        )
        .bind(shift.delta)
        .bind(board_id.to_string())
        .bind(shift.range.start)
        .bind(shift.range.end)
        .bind(shift.range.end)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    async fn delete_column(&mut self, id: ColumnId) -> KanbanResult<Vec<Attachment>> {
        let removed = self.attachments_where("col.id", id).await?;
        let result = sqlx::query("DELETE FROM columns WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        expect_row(result.rows_affected(), "Column")?;
        Ok(removed)
    }

    async fn find_card(&mut self, id: CardId) -> KanbanResult<Option<Card>> {
        sqlx::query("SELECT * FROM cards WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?
            .as_ref()
            .map(row_to_card)
            .transpose()
    }

    async fn list_active_cards(&mut self, column_id: ColumnId) -> KanbanResult<Vec<Card>> {
        sqlx::query(
            "SELECT * FROM cards WHERE column_id = ? AND archived = 0 ORDER BY position ASC",
        )
        .bind(column_id.to_string())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?
        .iter()
        .map(row_to_card)
        .collect()
    }

    async fn count_active_cards(&mut self, column_id: ColumnId) -> KanbanResult<usize> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM cards WHERE column_id = ? AND archived = 0",
        )
        .bind(column_id.to_string())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(count as usize)
    }

    async fn list_archived_cards(&mut self, board_id: BoardId) -> KanbanResult<Vec<Card>> {
        sqlx::query(
            "SELECT c.* FROM cards c
             JOIN columns col ON col.id = c.column_id
             WHERE col.board_id = ? AND c.archived = 1
             ORDER BY c.archived_at DESC",
        )
        .bind(board_id.to_string())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err)?
        .iter()
        .map(row_to_card)
        .collect()
    }

    async fn insert_card(&mut self, card: &Card) -> KanbanResult<()> {
        sqlx::query(
            "INSERT INTO cards (id, column_id, title, description, priority, tags, deadline,
                                position, archived, archived_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(card.id.to_string())
        .bind(card.column_id.to_string())
        .bind(&card.title)
        .bind(&card.description)
        .bind(card.priority.as_str())
        .bind(encode_tags(&card.tags)?)
        .bind(card.deadline.as_ref().map(timestamp))
        .bind(card.position)
        .bind(card.archived)
        .bind(card.archived_at.as_ref().map(timestamp))
        .bind(timestamp(&card.created_at))
        .bind(timestamp(&card.updated_at))
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn update_card(&mut self, card: &Card) -> KanbanResult<()> {
        let result = sqlx::query(
            "UPDATE cards SET column_id = ?, title = ?, description = ?, priority = ?, tags = ?,
                              deadline = ?, position = ?, archived = ?, archived_at = ?,
                              updated_at = ?
             WHERE id = ?",
        )
        .bind(card.column_id.to_string())
        .bind(&card.title)
        .bind(&card.description)
        .bind(card.priority.as_str())
        .bind(encode_tags(&card.tags)?)
        .bind(card.deadline.as_ref().map(timestamp))
        .bind(card.position)
        .bind(card.archived)
        .bind(card.archived_at.as_ref().map(timestamp))
        .bind(timestamp(&card.updated_at))
        .bind(card.id.to_string())
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        expect_row(result.rows_affected(), "Card")
    }

    async fn set_card_position(&mut self, id: CardId, position: Position) -> KanbanResult<()> {
        let result = sqlx::query("UPDATE cards SET position = ?, updated_at = ? WHERE id = ?")
            .bind(position)
            .bind(timestamp(&Utc::now()))
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        expect_row(result.rows_affected(), "Card")
    }

    async fn shift_cards(&mut self, column_id: ColumnId, shift: Shift) -> KanbanResult<u64> {
        let result = sqlx::query(
            "UPDATE cards SET position = position + ?
             WHERE column_id = ? AND archived = 0
               AND position >= ? AND (? IS NULL OR position <= ?)",
        )
        .bind(shift.delta)
        .bind(column_id.to_string())
        .bind(shift.range.start)
        .bind(shift.range.end)
        .bind(shift.range.end)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }

    async fn delete_card(&mut self, id: CardId) -> KanbanResult<Vec<Attachment>> {
        let removed = self.attachments_where("c.id", id).await?;
        let result = sqlx::query("DELETE FROM cards WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        expect_row(result.rows_affected(), "Card")?;
        Ok(removed)
    }

    async fn find_attachment(&mut self, id: AttachmentId) -> KanbanResult<Option<Attachment>> {
        sqlx::query("SELECT * FROM attachments WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?
            .as_ref()
            .map(row_to_attachment)
            .transpose()
    }

    async fn list_attachments(&mut self, card_id: CardId) -> KanbanResult<Vec<Attachment>> {
        sqlx::query("SELECT * FROM attachments WHERE card_id = ? ORDER BY created_at DESC")
            .bind(card_id.to_string())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?
            .iter()
            .map(row_to_attachment)
            .collect()
    }

    async fn insert_attachment(&mut self, attachment: &Attachment) -> KanbanResult<()> {
        sqlx::query(
            "INSERT INTO attachments (id, card_id, user_id, filename, original_name, mime_type,
                                      size, path, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(attachment.id.to_string())
        .bind(attachment.card_id.to_string())
        .bind(attachment.user_id.to_string())
        .bind(&attachment.filename)
        .bind(&attachment.original_name)
        .bind(&attachment.mime_type)
        .bind(attachment.size)
        .bind(&attachment.path)
        .bind(timestamp(&attachment.created_at))
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn delete_attachment(&mut self, id: AttachmentId) -> KanbanResult<()> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        expect_row(result.rows_affected(), "Attachment")
    }

    async fn commit(self: Box<Self>) -> KanbanResult<()> {
        let this = *self;
        this.tx.commit().await.map_err(db_err)
    }

    async fn rollback(self: Box<Self>) -> KanbanResult<()> {
        let this = *self;
        this.tx.rollback().await.map_err(db_err)
    }
}

/// Lock contention surfaces as `Conflict` so callers may retry the request.
fn db_err(e: sqlx::Error) -> KanbanError {
    if let Some(code) = e.as_database_error().and_then(|db| db.code()) {
        match code.as_ref() {
            // SQLITE_BUSY, SQLITE_LOCKED, SQLITE_LOCKED_SHAREDCACHE, SQLITE_BUSY_SNAPSHOT
            "5" | "6" | "262" | "517" => {
                return KanbanError::Conflict("Database is busy, retry the request".to_string())
            }
            // SQLITE_CONSTRAINT_PRIMARYKEY, SQLITE_CONSTRAINT_UNIQUE
            "1555" | "2067" => return KanbanError::Conflict("Row already exists".to_string()),
            _ => {}
        }
    }
    KanbanError::Database(e.to_string())
}

fn expect_row(rows_affected: u64, kind: &str) -> KanbanResult<()> {
    if rows_affected == 0 {
        Err(KanbanError::not_found(kind))
    } else {
        Ok(())
    }
}

/// Fixed-width RFC 3339, so text order matches time order.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn encode_tags(tags: &BTreeSet<String>) -> KanbanResult<String> {
    serde_json::to_string(tags).map_err(|e| KanbanError::Serialization(e.to_string()))
}

fn get<'r, T>(row: &'r SqliteRow, column: &str) -> KanbanResult<T>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(column).map_err(db_err)
}

fn get_id(row: &SqliteRow, column: &str) -> KanbanResult<Uuid> {
    let raw: String = get(row, column)?;
    Uuid::parse_str(&raw).map_err(|e| KanbanError::Serialization(e.to_string()))
}

fn parse_time(raw: &str) -> KanbanResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| KanbanError::Serialization(e.to_string()))
}

fn get_time(row: &SqliteRow, column: &str) -> KanbanResult<DateTime<Utc>> {
    let raw: String = get(row, column)?;
    parse_time(&raw)
}

fn get_opt_time(row: &SqliteRow, column: &str) -> KanbanResult<Option<DateTime<Utc>>> {
    let raw: Option<String> = get(row, column)?;
    raw.as_deref().map(parse_time).transpose()
}

fn row_to_user(row: &SqliteRow) -> KanbanResult<User> {
    Ok(User {
        id: get_id(row, "id")?,
        email: get(row, "email")?,
        password_hash: get(row, "password_hash")?,
        first_name: get(row, "first_name")?,
        last_name: get(row, "last_name")?,
        created_at: get_time(row, "created_at")?,
    })
}

fn row_to_board(row: &SqliteRow) -> KanbanResult<Board> {
    Ok(Board {
        id: get_id(row, "id")?,
        title: get(row, "title")?,
        owner_id: get_id(row, "owner_id")?,
        icon: get(row, "icon")?,
        favorite: get(row, "favorite")?,
        created_at: get_time(row, "created_at")?,
        updated_at: get_time(row, "updated_at")?,
    })
}

fn row_to_column(row: &SqliteRow) -> KanbanResult<Column> {
    Ok(Column {
        id: get_id(row, "id")?,
        board_id: get_id(row, "board_id")?,
        title: get(row, "title")?,
        position: get(row, "position")?,
        created_at: get_time(row, "created_at")?,
        updated_at: get_time(row, "updated_at")?,
    })
}

fn row_to_card(row: &SqliteRow) -> KanbanResult<Card> {
    let priority: String = get(row, "priority")?;
    let tags: String = get(row, "tags")?;
    Ok(Card {
        id: get_id(row, "id")?,
        column_id: get_id(row, "column_id")?,
        title: get(row, "title")?,
        description: get(row, "description")?,
        priority: CardPriority::from_str(&priority)?,
        tags: serde_json::from_str(&tags)
            .map_err(|e| KanbanError::Serialization(e.to_string()))?,
        deadline: get_opt_time(row, "deadline")?,
        position: get(row, "position")?,
        archived: get(row, "archived")?,
        archived_at: get_opt_time(row, "archived_at")?,
        created_at: get_time(row, "created_at")?,
        updated_at: get_time(row, "updated_at")?,
    })
}

fn row_to_attachment(row: &SqliteRow) -> KanbanResult<Attachment> {
    Ok(Attachment {
        id: get_id(row, "id")?,
        card_id: get_id(row, "card_id")?,
        user_id: get_id(row, "user_id")?,
        filename: get(row, "filename")?,
        original_name: get(row, "original_name")?,
        mime_type: get(row, "mime_type")?,
        size: get(row, "size")?,
        path: get(row, "path")?,
        created_at: get_time(row, "created_at")?,
    })
}
