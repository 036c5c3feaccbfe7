use crate::error::{BiblioError, BiblioResult};
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// A user's single review of a book.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A review joined with the reviewer's public identity, for book pages.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewWithAuthor {
    pub review: Review,
    pub author_name: String,
    pub author_picture: Option<String>,
}

pub struct ReviewStorage {
    pool: SqlitePool,
}

impl ReviewStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a review. The unique index on (user_id, book_id) is the
    /// invariant's enforcement point; a conflict, even one raced in by
    /// a concurrent request, comes back as [`BiblioError::Duplicate`]
    /// and leaves the original row untouched.
    pub async fn insert(
        &self,
        user_id: i64,
        book_id: i64,
        rating: i64,
        comment: Option<&str>,
    ) -> BiblioResult<Review> {
        let result = sqlx::query(
            "INSERT INTO reviews (user_id, book_id, rating, comment)
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(book_id)
        .bind(rating)
        .bind(comment)
        .execute(&self.pool)
        .await
        .map_err(|e| BiblioError::duplicate_or_db(e, "review"))?;

        let id = result.last_insert_rowid();
        self.review(id).await?.ok_or(BiblioError::NotFound("review"))
    }

    pub async fn review(&self, id: i64) -> BiblioResult<Option<Review>> {
        let row = sqlx::query(
            "SELECT id, user_id, book_id, rating, comment, created_at, updated_at
             FROM reviews WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| review_from_row(&row)))
    }

    pub async fn review_for(&self, user_id: i64, book_id: i64) -> BiblioResult<Option<Review>> {
        let row = sqlx::query(
            "SELECT id, user_id, book_id, rating, comment, created_at, updated_at
             FROM reviews WHERE user_id = ? AND book_id = ?",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| review_from_row(&row)))
    }

    /// Overwrites rating and comment in place; the (user, book) pair of
    /// a review never changes.
    pub async fn update(&self, id: i64, rating: i64, comment: Option<&str>) -> BiblioResult<()> {
        sqlx::query(
            "UPDATE reviews SET rating = ?, comment = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(rating)
        .bind(comment)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, id: i64) -> BiblioResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All reviews of a book with their authors, newest first.
    pub async fn for_book(&self, book_id: i64) -> BiblioResult<Vec<ReviewWithAuthor>> {
        let rows = sqlx::query(
            "SELECT r.id, r.user_id, r.book_id, r.rating, r.comment,
                    r.created_at, r.updated_at, u.name, u.profile_picture
             FROM reviews r
             JOIN users u ON u.id = r.user_id
             WHERE r.book_id = ?
             ORDER BY r.created_at DESC, r.id DESC",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ReviewWithAuthor {
                review: review_from_row(&row),
                author_name: row.get(7),
                author_picture: row.get(8),
            })
            .collect())
    }

    /// Mean rating over the book's current reviews, 0 when there are
    /// none. Always derived on read; nothing stores it.
    pub async fn average_rating(&self, book_id: i64) -> BiblioResult<f64> {
        let row = sqlx::query(
            "SELECT CAST(COALESCE(AVG(rating), 0) AS REAL)
             FROM reviews WHERE book_id = ?",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get(0))
    }

    pub async fn count_for(&self, book_id: i64) -> BiblioResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) FROM reviews WHERE book_id = ?")
            .bind(book_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get(0))
    }
}

fn review_from_row(row: &SqliteRow) -> Review {
    Review {
        id: row.get(0),
        user_id: row.get(1),
        book_id: row.get(2),
        rating: row.get(3),
        comment: row.get(4),
        created_at: row.get(5),
        updated_at: row.get(6),
    }
}
