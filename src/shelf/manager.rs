use crate::auth::{self, Principal};
use crate::catalog::storage::{BookWithCategory, CatalogStorage};
use crate::error::{BiblioError, BiblioResult, Violations};
use crate::shelf::storage::{ShelfEntry, ShelfStorage, ShelfType};
use serde::Serialize;
use sqlx::SqlitePool;

/// Parses a caller-supplied shelf type, rejecting anything outside the
/// three enumerated values as a field violation.
pub fn parse_shelf_type(raw: &str) -> BiblioResult<ShelfType> {
    ShelfType::parse(raw).ok_or_else(|| {
        let mut violations = Violations::new();
        violations.add(
            "shelf_type",
            "must be one of want_to_read, currently_reading, read",
        );
        BiblioError::Validation(violations)
    })
}

/// A user's shelves: three disjoint book lists, one per shelf type.
#[derive(Debug, Clone, Serialize)]
pub struct UserShelves {
    pub want_to_read: Vec<BookWithCategory>,
    pub currently_reading: Vec<BookWithCategory>,
    pub read: Vec<BookWithCategory>,
}

/// High-level shelf operations.
///
/// The shelf state machine is per (user, book) pair: each user moves
/// each book freely between `want_to_read`, `currently_reading`, and
/// `read`, or off the shelf entirely. There is no per-book global
/// state and no terminal shelf.
pub struct ShelfManager {
    shelves: ShelfStorage,
    catalog: CatalogStorage,
}

impl ShelfManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            shelves: ShelfStorage::new(pool.clone()),
            catalog: CatalogStorage::new(pool),
        }
    }

    /// Puts a book on one of the caller's shelves, moving it if it is
    /// already on another one. Assigning the same type twice succeeds
    /// and changes nothing.
    pub async fn assign(
        &self,
        principal: &Principal,
        book_id: i64,
        shelf_type: &str,
    ) -> BiblioResult<ShelfEntry> {
        let shelf_type = parse_shelf_type(shelf_type)?;

        if self.catalog.book(book_id).await?.is_none() {
            return Err(BiblioError::NotFound("book"));
        }

        let entry = self
            .shelves
            .upsert(principal.user_id, book_id, shelf_type)
            .await?;
        tracing::debug!(
            user_id = principal.user_id,
            book_id,
            shelf = shelf_type.as_str(),
            "shelf assigned"
        );
        Ok(entry)
    }

    /// Changes the shelf type of an existing entry the caller owns.
    pub async fn update(
        &self,
        principal: &Principal,
        entry_id: i64,
        shelf_type: &str,
    ) -> BiblioResult<ShelfEntry> {
        let shelf_type = parse_shelf_type(shelf_type)?;
        let entry = self
            .shelves
            .entry(entry_id)
            .await?
            .ok_or(BiblioError::NotFound("shelf entry"))?;
        auth::require_owner(principal, entry.user_id, "shelf entry")?;

        self.shelves.set_type(entry_id, shelf_type).await?;
        self.shelves
            .entry(entry_id)
            .await?
            .ok_or(BiblioError::NotFound("shelf entry"))
    }

    /// Takes a book off the caller's shelf.
    pub async fn remove(&self, principal: &Principal, entry_id: i64) -> BiblioResult<()> {
        let entry = self
            .shelves
            .entry(entry_id)
            .await?
            .ok_or(BiblioError::NotFound("shelf entry"))?;
        auth::require_owner(principal, entry.user_id, "shelf entry")?;

        self.shelves.delete(entry_id).await?;
        tracing::debug!(
            user_id = principal.user_id,
            book_id = entry.book_id,
            "shelf entry removed"
        );
        Ok(())
    }

    /// The caller's full shelf overview.
    pub async fn shelves(&self, principal: &Principal) -> BiblioResult<UserShelves> {
        Ok(UserShelves {
            want_to_read: self
                .shelves
                .books_on(principal.user_id, ShelfType::WantToRead)
                .await?,
            currently_reading: self
                .shelves
                .books_on(principal.user_id, ShelfType::CurrentlyReading)
                .await?,
            read: self
                .shelves
                .books_on(principal.user_id, ShelfType::Read)
                .await?,
        })
    }

    /// The shelf a user currently has a book on, if any.
    pub async fn current_shelf(
        &self,
        user_id: i64,
        book_id: i64,
    ) -> BiblioResult<Option<ShelfType>> {
        Ok(self
            .shelves
            .entry_for(user_id, book_id)
            .await?
            .map(|entry| entry.shelf_type))
    }
}
