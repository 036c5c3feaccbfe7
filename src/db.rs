use crate::error::{BiblioError, BiblioResult};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::fs;
use std::path::{Path, PathBuf};

/// The statements are idempotent so opening an existing database is a
/// no-op. Uniqueness on (user_id, book_id) for shelves and reviews is
/// declared here, at the storage layer, so concurrent inserts for the
/// same pair cannot produce duplicate rows.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        profile_picture TEXT,
        created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS books (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        author TEXT NOT NULL,
        description TEXT,
        cover_image TEXT,
        isbn TEXT,
        published_year INTEGER,
        publisher TEXT,
        category_id INTEGER NOT NULL REFERENCES categories (id),
        created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS bookshelves (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        book_id INTEGER NOT NULL REFERENCES books (id) ON DELETE CASCADE,
        shelf_type TEXT NOT NULL
            CHECK (shelf_type IN ('want_to_read', 'currently_reading', 'read')),
        created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (user_id, book_id)
    )",
    "CREATE TABLE IF NOT EXISTS reviews (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        book_id INTEGER NOT NULL REFERENCES books (id) ON DELETE CASCADE,
        rating INTEGER NOT NULL,
        comment TEXT,
        created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (user_id, book_id)
    )",
    "CREATE INDEX IF NOT EXISTS books_category_idx ON books (category_id)",
    "CREATE INDEX IF NOT EXISTS reviews_book_idx ON reviews (book_id)",
    "CREATE INDEX IF NOT EXISTS bookshelves_user_idx ON bookshelves (user_id)",
];

/// Handle on the application database.
///
/// Wraps a [`SqlitePool`]; all service types are built from clones of
/// the pool. Foreign-key enforcement is switched on per connection so
/// the `ON DELETE CASCADE` declarations above actually apply: deleting
/// a book takes its shelf entries and reviews with it.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if missing) the database file at `path` and
    /// applies the schema.
    pub async fn open(path: &Path) -> BiblioResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;
        Self::init(&pool).await?;

        Ok(Self { pool })
    }

    /// Opens an in-memory database for short-lived use.
    ///
    /// Capped at a single connection: every connection to `:memory:`
    /// gets its own database, so a larger pool would see empty tables.
    pub async fn open_in_memory() -> BiblioResult<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::init(&pool).await?;

        Ok(Self { pool })
    }

    /// Opens the database at the default location,
    /// `<data_dir>/biblio/biblio.db`, creating directories as needed.
    pub async fn open_default() -> BiblioResult<Self> {
        let path = Self::default_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::open(&path).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn default_path() -> BiblioResult<PathBuf> {
        let data = dirs::data_dir().ok_or(BiblioError::NotFound("data directory"))?;
        Ok(data.join("biblio").join("biblio.db"))
    }

    async fn init(pool: &SqlitePool) -> BiblioResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(pool).await?;
        }
        Ok(())
    }
}
