use crate::catalog::storage::{BOOK_COLUMNS, BookWithCategory, book_with_category_from_row};
use crate::error::{BiblioError, BiblioResult};
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::fmt;

/// A user's reading status for one book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ShelfType {
    WantToRead,
    CurrentlyReading,
    Read,
}

impl ShelfType {
    pub const ALL: [ShelfType; 3] = [
        ShelfType::WantToRead,
        ShelfType::CurrentlyReading,
        ShelfType::Read,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShelfType::WantToRead => "want_to_read",
            ShelfType::CurrentlyReading => "currently_reading",
            ShelfType::Read => "read",
        }
    }

    /// Parses the wire form (`want_to_read`, `currently_reading`,
    /// `read`). Returns `None` for anything else.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "want_to_read" => Some(ShelfType::WantToRead),
            "currently_reading" => Some(ShelfType::CurrentlyReading),
            "read" => Some(ShelfType::Read),
            _ => None,
        }
    }

    /// Human-readable shelf name for presentation.
    pub fn display_name(self) -> &'static str {
        match self {
            ShelfType::WantToRead => "Want to Read",
            ShelfType::CurrentlyReading => "Currently Reading",
            ShelfType::Read => "Read",
        }
    }
}

impl fmt::Display for ShelfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the bookshelves table: a (user, book) pair with its
/// current shelf type. At most one exists per pair.
#[derive(Debug, Clone, Serialize)]
pub struct ShelfEntry {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub shelf_type: ShelfType,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

pub struct ShelfStorage {
    pool: SqlitePool,
}

impl ShelfStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a shelf entry, or overwrites the shelf type in place if
    /// the (user, book) pair already has one. A single statement backed
    /// by the unique index, so two concurrent assignments cannot leave
    /// duplicate rows.
    pub async fn upsert(
        &self,
        user_id: i64,
        book_id: i64,
        shelf_type: ShelfType,
    ) -> BiblioResult<ShelfEntry> {
        sqlx::query(
            "INSERT INTO bookshelves (user_id, book_id, shelf_type)
             VALUES (?, ?, ?)
             ON CONFLICT (user_id, book_id) DO UPDATE SET
                 shelf_type = excluded.shelf_type,
                 updated_at = CURRENT_TIMESTAMP",
        )
        .bind(user_id)
        .bind(book_id)
        .bind(shelf_type)
        .execute(&self.pool)
        .await?;

        self.entry_for(user_id, book_id)
            .await?
            .ok_or(BiblioError::NotFound("shelf entry"))
    }

    pub async fn entry(&self, id: i64) -> BiblioResult<Option<ShelfEntry>> {
        let row = sqlx::query(
            "SELECT id, user_id, book_id, shelf_type, created_at, updated_at
             FROM bookshelves WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| entry_from_row(&row)))
    }

    pub async fn entry_for(&self, user_id: i64, book_id: i64) -> BiblioResult<Option<ShelfEntry>> {
        let row = sqlx::query(
            "SELECT id, user_id, book_id, shelf_type, created_at, updated_at
             FROM bookshelves WHERE user_id = ? AND book_id = ?",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| entry_from_row(&row)))
    }

    pub async fn set_type(&self, id: i64, shelf_type: ShelfType) -> BiblioResult<()> {
        sqlx::query(
            "UPDATE bookshelves SET shelf_type = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(shelf_type)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, id: i64) -> BiblioResult<bool> {
        let result = sqlx::query("DELETE FROM bookshelves WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// The books a user has placed on one shelf, each with its
    /// category. Ordered by entry id; callers get membership, not a
    /// guaranteed ordering.
    pub async fn books_on(
        &self,
        user_id: i64,
        shelf_type: ShelfType,
    ) -> BiblioResult<Vec<BookWithCategory>> {
        let sql = format!(
            "SELECT {BOOK_COLUMNS}, c.name
             FROM bookshelves s
             JOIN books b ON b.id = s.book_id
             JOIN categories c ON c.id = b.category_id
             WHERE s.user_id = ? AND s.shelf_type = ?
             ORDER BY s.id"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(shelf_type)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(book_with_category_from_row).collect())
    }
}

fn entry_from_row(row: &SqliteRow) -> ShelfEntry {
    ShelfEntry {
        id: row.get(0),
        user_id: row.get(1),
        book_id: row.get(2),
        shelf_type: row.get(3),
        created_at: row.get(4),
        updated_at: row.get(5),
    }
}
