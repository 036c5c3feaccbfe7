use crate::error::{BiblioError, BiblioResult};
use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// A user account, without the credential hash. The hash only moves
/// through [`ProfileStorage::password_hash`] so it cannot end up in a
/// rendered or serialized record by accident.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub created_at: NaiveDateTime,
}

pub struct ProfileStorage {
    pool: SqlitePool,
}

impl ProfileStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a user. The unique email index is the enforcement point;
    /// a conflict comes back as [`BiblioError::Duplicate`].
    pub async fn insert(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> BiblioResult<User> {
        let result = sqlx::query(
            "INSERT INTO users (name, email, password_hash) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| BiblioError::duplicate_or_db(e, "email"))?;

        let id = result.last_insert_rowid();
        self.user(id).await?.ok_or(BiblioError::NotFound("user"))
    }

    pub async fn user(&self, id: i64) -> BiblioResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, email, profile_picture, created_at
             FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| user_from_row(&row)))
    }

    pub async fn find_by_email(&self, email: &str) -> BiblioResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, email, profile_picture, created_at
             FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| user_from_row(&row)))
    }

    /// The stored credential hash of an existing user row.
    pub async fn password_hash(&self, id: i64) -> BiblioResult<String> {
        let row = sqlx::query("SELECT password_hash FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row.get(0))
            .ok_or(BiblioError::NotFound("user"))
    }

    /// Whether another user already holds this email address.
    pub async fn email_taken(&self, email: &str, exclude_id: i64) -> BiblioResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = ? AND id != ?)",
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get(0))
    }

    /// Overwrites name, email, and the stored profile-picture filename
    /// (pass the previous one through to keep it). An email race lost
    /// against the unique index reads as a duplicate.
    pub async fn update(
        &self,
        id: i64,
        name: &str,
        email: &str,
        profile_picture: Option<&str>,
    ) -> BiblioResult<User> {
        sqlx::query(
            "UPDATE users SET name = ?, email = ?, profile_picture = ?,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(name)
        .bind(email)
        .bind(profile_picture)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| BiblioError::duplicate_or_db(e, "email"))?;

        self.user(id).await?.ok_or(BiblioError::NotFound("user"))
    }

    pub async fn set_password_hash(&self, id: i64, password_hash: &str) -> BiblioResult<()> {
        sqlx::query(
            "UPDATE users SET password_hash = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get(0),
        name: row.get(1),
        email: row.get(2),
        profile_picture: row.get(3),
        created_at: row.get(4),
    }
}
