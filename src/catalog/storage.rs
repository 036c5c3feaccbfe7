use crate::error::{BiblioError, BiblioResult};
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Fixed page size for every paginated catalog read.
pub const PAGE_SIZE: u32 = 12;

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A category together with how many books it currently holds.
#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
    pub book_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub isbn: Option<String>,
    pub published_year: Option<i64>,
    pub publisher: Option<String>,
    pub category_id: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookWithCategory {
    pub book: Book,
    pub category: Category,
}

/// The writable columns of a book, as submitted by catalog management.
/// The stored cover filename is handled separately since replacing it
/// has a file side effect.
#[derive(Debug, Clone, Default)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub isbn: Option<String>,
    pub published_year: Option<i64>,
    pub publisher: Option<String>,
    pub category_id: i64,
}

/// One page of results plus the total row count of the filtered set,
/// so callers can render page controls. Pages are 1-based.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u32 {
        (self.total as u32).div_ceil(self.per_page.max(1))
    }
}

pub(crate) const BOOK_COLUMNS: &str =
    "b.id, b.title, b.author, b.description, b.cover_image, b.isbn, \
     b.published_year, b.publisher, b.category_id, b.created_at";

pub struct CatalogStorage {
    pool: SqlitePool,
}

impl CatalogStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn book(&self, id: i64) -> BiblioResult<Option<Book>> {
        let row = sqlx::query(
            "SELECT id, title, author, description, cover_image, isbn,
                    published_year, publisher, category_id, created_at
             FROM books WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| book_from_row(&row)))
    }

    pub async fn book_with_category(&self, id: i64) -> BiblioResult<Option<BookWithCategory>> {
        let sql = format!(
            "SELECT {BOOK_COLUMNS}, c.name
             FROM books b
             JOIN categories c ON c.id = b.category_id
             WHERE b.id = ?"
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        Ok(row.map(|row| book_with_category_from_row(&row)))
    }

    /// Newest-first catalog page; the unfiltered case of [`search`].
    ///
    /// [`search`]: CatalogStorage::search
    pub async fn page(&self, page: u32) -> BiblioResult<Page<BookWithCategory>> {
        self.search(None, None, page).await
    }

    /// Case-insensitive substring search over title, author, and
    /// description, optionally restricted to one category. Both filters
    /// are optional; with neither this is the plain paginated listing.
    pub async fn search(
        &self,
        query: Option<&str>,
        category_id: Option<i64>,
        page: u32,
    ) -> BiblioResult<Page<BookWithCategory>> {
        let page = page.max(1);
        let pattern = query.map(|q| format!("%{q}%"));

        let count_row = sqlx::query(
            "SELECT COUNT(*) FROM books b
             WHERE (?1 IS NULL
                    OR b.title LIKE ?1
                    OR b.author LIKE ?1
                    OR b.description LIKE ?1)
               AND (?2 IS NULL OR b.category_id = ?2)",
        )
        .bind(pattern.as_deref())
        .bind(category_id)
        .fetch_one(&self.pool)
        .await?;
        let total: i64 = count_row.get(0);

        let sql = format!(
            "SELECT {BOOK_COLUMNS}, c.name
             FROM books b
             JOIN categories c ON c.id = b.category_id
             WHERE (?1 IS NULL
                    OR b.title LIKE ?1
                    OR b.author LIKE ?1
                    OR b.description LIKE ?1)
               AND (?2 IS NULL OR b.category_id = ?2)
             ORDER BY b.created_at DESC, b.id DESC
             LIMIT ?3 OFFSET ?4"
        );
        let rows = sqlx::query(&sql)
            .bind(pattern.as_deref())
            .bind(category_id)
            .bind(i64::from(PAGE_SIZE))
            .bind(i64::from((page - 1) * PAGE_SIZE))
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: rows.iter().map(book_with_category_from_row).collect(),
            page,
            per_page: PAGE_SIZE,
            total: total as u64,
        })
    }

    /// The most recently added books, newest first.
    pub async fn latest(&self, limit: u32) -> BiblioResult<Vec<BookWithCategory>> {
        let sql = format!(
            "SELECT {BOOK_COLUMNS}, c.name
             FROM books b
             JOIN categories c ON c.id = b.category_id
             ORDER BY b.created_at DESC, b.id DESC
             LIMIT ?"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(book_with_category_from_row).collect())
    }

    /// Books ranked by how many reviews they have collected.
    pub async fn most_reviewed(&self, limit: u32) -> BiblioResult<Vec<BookWithCategory>> {
        let sql = format!(
            "SELECT {BOOK_COLUMNS}, c.name, COUNT(r.id) AS review_count
             FROM books b
             JOIN categories c ON c.id = b.category_id
             LEFT JOIN reviews r ON r.book_id = b.id
             GROUP BY b.id
             ORDER BY review_count DESC, b.id DESC
             LIMIT ?"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(book_with_category_from_row).collect())
    }

    pub async fn insert_book(
        &self,
        draft: &BookDraft,
        cover_image: Option<&str>,
    ) -> BiblioResult<Book> {
        let result = sqlx::query(
            "INSERT INTO books (title, author, description, cover_image, isbn,
                                published_year, publisher, category_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&draft.title)
        .bind(&draft.author)
        .bind(&draft.description)
        .bind(cover_image)
        .bind(&draft.isbn)
        .bind(draft.published_year)
        .bind(&draft.publisher)
        .bind(draft.category_id)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.book(id).await?.ok_or(BiblioError::NotFound("book"))
    }

    /// Overwrites all writable columns, including the stored cover
    /// filename (pass the previous one through to keep it).
    pub async fn update_book(
        &self,
        id: i64,
        draft: &BookDraft,
        cover_image: Option<&str>,
    ) -> BiblioResult<Book> {
        sqlx::query(
            "UPDATE books SET
                 title = ?, author = ?, description = ?, cover_image = ?,
                 isbn = ?, published_year = ?, publisher = ?, category_id = ?
             WHERE id = ?",
        )
        .bind(&draft.title)
        .bind(&draft.author)
        .bind(&draft.description)
        .bind(cover_image)
        .bind(&draft.isbn)
        .bind(draft.published_year)
        .bind(&draft.publisher)
        .bind(draft.category_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.book(id).await?.ok_or(BiblioError::NotFound("book"))
    }

    /// Deletes the row; shelf entries and reviews follow via cascade.
    pub async fn delete_book(&self, id: i64) -> BiblioResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn category(&self, id: i64) -> BiblioResult<Option<Category>> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Category {
            id: row.get(0),
            name: row.get(1),
        }))
    }

    /// All categories with their book counts, alphabetical.
    pub async fn categories(&self) -> BiblioResult<Vec<CategorySummary>> {
        let rows = sqlx::query(
            "SELECT c.id, c.name, COUNT(b.id)
             FROM categories c
             LEFT JOIN books b ON b.category_id = c.id
             GROUP BY c.id
             ORDER BY c.name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CategorySummary {
                id: row.get(0),
                name: row.get(1),
                book_count: row.get(2),
            })
            .collect())
    }

    pub async fn insert_category(&self, name: &str) -> BiblioResult<Category> {
        let result = sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(Category {
            id: result.last_insert_rowid(),
            name: name.to_string(),
        })
    }
}

fn book_from_row(row: &SqliteRow) -> Book {
    Book {
        id: row.get(0),
        title: row.get(1),
        author: row.get(2),
        description: row.get(3),
        cover_image: row.get(4),
        isbn: row.get(5),
        published_year: row.get(6),
        publisher: row.get(7),
        category_id: row.get(8),
        created_at: row.get(9),
    }
}

pub(crate) fn book_with_category_from_row(row: &SqliteRow) -> BookWithCategory {
    let book = book_from_row(row);
    let category = Category {
        id: book.category_id,
        name: row.get(10),
    };

    BookWithCategory { book, category }
}
