use crate::auth::{self, Principal};
use crate::catalog::storage::{
    Book, BookDraft, BookWithCategory, CatalogStorage, Category, CategorySummary, Page,
};
use crate::error::{BiblioError, BiblioResult, Violations};
use crate::media::{MediaStore, MediaUpload};
use crate::review::storage::{Review, ReviewStorage, ReviewWithAuthor};
use crate::shelf::storage::{ShelfStorage, ShelfType};
use chrono::{Datelike, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

const MAX_TEXT_LEN: usize = 255;
const MAX_ISBN_LEN: usize = 20;
const MIN_PUBLISHED_YEAR: i64 = 1000;

/// Everything a book page needs: the book, its category and reviews,
/// the derived rating figures, and, for an authenticated viewer, that
/// viewer's own review and current shelf.
#[derive(Debug, Clone, Serialize)]
pub struct BookDetail {
    pub book: Book,
    pub category: Category,
    pub reviews: Vec<ReviewWithAuthor>,
    pub average_rating: f64,
    pub review_count: i64,
    pub viewer_review: Option<Review>,
    pub viewer_shelf: Option<ShelfType>,
}

/// High-level catalog operations.
///
/// Reads are public; mutations require catalog-management rights and
/// handle the cover-image side effects (new file written before the
/// row lands, replaced file removed after).
pub struct CatalogManager {
    books: CatalogStorage,
    reviews: ReviewStorage,
    shelves: ShelfStorage,
    media: MediaStore,
}

impl CatalogManager {
    pub fn new(pool: SqlitePool, media: MediaStore) -> Self {
        Self {
            books: CatalogStorage::new(pool.clone()),
            reviews: ReviewStorage::new(pool.clone()),
            shelves: ShelfStorage::new(pool),
            media,
        }
    }

    /// Newest-first catalog page (fixed page size).
    pub async fn list_books(&self, page: u32) -> BiblioResult<Page<BookWithCategory>> {
        self.books.page(page).await
    }

    /// Filtered catalog page. A blank query counts as no query, so an
    /// empty search form degrades to the plain listing.
    pub async fn search_books(
        &self,
        query: Option<&str>,
        category_id: Option<i64>,
        page: u32,
    ) -> BiblioResult<Page<BookWithCategory>> {
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        self.books.search(query, category_id, page).await
    }

    /// The most recently added books, for the landing page.
    pub async fn latest_books(&self, limit: u32) -> BiblioResult<Vec<BookWithCategory>> {
        self.books.latest(limit).await
    }

    /// The most-reviewed books, for the landing page.
    pub async fn popular_books(&self, limit: u32) -> BiblioResult<Vec<BookWithCategory>> {
        self.books.most_reviewed(limit).await
    }

    /// Full detail for one book. With a `viewer`, the result also
    /// carries that viewer's own review and current shelf type.
    pub async fn get_book(
        &self,
        id: i64,
        viewer: Option<&Principal>,
    ) -> BiblioResult<BookDetail> {
        let with_category = self
            .books
            .book_with_category(id)
            .await?
            .ok_or(BiblioError::NotFound("book"))?;

        let reviews = self.reviews.for_book(id).await?;
        let average_rating = self.reviews.average_rating(id).await?;
        let review_count = self.reviews.count_for(id).await?;

        let (viewer_review, viewer_shelf) = match viewer {
            Some(principal) => (
                self.reviews.review_for(principal.user_id, id).await?,
                self.shelves
                    .entry_for(principal.user_id, id)
                    .await?
                    .map(|entry| entry.shelf_type),
            ),
            None => (None, None),
        };

        Ok(BookDetail {
            book: with_category.book,
            category: with_category.category,
            reviews,
            average_rating,
            review_count,
            viewer_review,
            viewer_shelf,
        })
    }

    /// Adds a book to the catalog. Catalog-management only.
    ///
    /// The cover image, if any, is validated together with the field
    /// constraints and written to disk before the row is inserted, so a
    /// stored row never references a file that was not written.
    pub async fn create_book(
        &self,
        principal: &Principal,
        draft: BookDraft,
        cover: Option<MediaUpload>,
    ) -> BiblioResult<Book> {
        auth::require_catalog_management(principal)?;
        self.validate(&draft, cover.as_ref()).await?;

        let cover_name = match &cover {
            Some(upload) => Some(self.media.store_cover(upload)?),
            None => None,
        };

        let book = self.books.insert_book(&draft, cover_name.as_deref()).await?;
        tracing::info!(book_id = book.id, title = %book.title, "book created");
        Ok(book)
    }

    /// Updates a book. Catalog-management only.
    ///
    /// Passing a new cover replaces the stored file: the new one is
    /// written first, and the old one removed only after the row points
    /// at the replacement.
    pub async fn update_book(
        &self,
        principal: &Principal,
        id: i64,
        draft: BookDraft,
        new_cover: Option<MediaUpload>,
    ) -> BiblioResult<Book> {
        auth::require_catalog_management(principal)?;

        let existing = self
            .books
            .book(id)
            .await?
            .ok_or(BiblioError::NotFound("book"))?;
        self.validate(&draft, new_cover.as_ref()).await?;

        let replacement = match &new_cover {
            Some(upload) => Some(self.media.store_cover(upload)?),
            None => None,
        };
        let cover_name = replacement.as_deref().or(existing.cover_image.as_deref());

        let book = self.books.update_book(id, &draft, cover_name).await?;

        if replacement.is_some() {
            if let Some(old) = &existing.cover_image {
                self.media.remove_cover(old)?;
            }
        }

        tracing::info!(book_id = id, "book updated");
        Ok(book)
    }

    /// Removes a book, its shelf entries and reviews (cascade), and its
    /// stored cover file. Catalog-management only.
    pub async fn delete_book(&self, principal: &Principal, id: i64) -> BiblioResult<()> {
        auth::require_catalog_management(principal)?;

        let existing = self
            .books
            .book(id)
            .await?
            .ok_or(BiblioError::NotFound("book"))?;

        self.books.delete_book(id).await?;
        if let Some(cover) = &existing.cover_image {
            self.media.remove_cover(cover)?;
        }

        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }

    /// All categories with their book counts.
    pub async fn list_categories(&self) -> BiblioResult<Vec<CategorySummary>> {
        self.books.categories().await
    }

    /// One category and a page of its books.
    pub async fn category_books(
        &self,
        category_id: i64,
        page: u32,
    ) -> BiblioResult<(Category, Page<BookWithCategory>)> {
        let category = self
            .books
            .category(category_id)
            .await?
            .ok_or(BiblioError::NotFound("category"))?;
        let books = self.books.search(None, Some(category_id), page).await?;
        Ok((category, books))
    }

    /// Adds a category. Catalog-management only.
    pub async fn create_category(
        &self,
        principal: &Principal,
        name: &str,
    ) -> BiblioResult<Category> {
        auth::require_catalog_management(principal)?;

        let mut violations = Violations::new();
        check_required_text(&mut violations, "name", name);
        violations.into_result()?;

        self.books.insert_category(name.trim()).await
    }

    /// Checks every field constraint, reporting all violations at once.
    async fn validate(
        &self,
        draft: &BookDraft,
        cover: Option<&MediaUpload>,
    ) -> BiblioResult<()> {
        let mut violations = Violations::new();

        check_required_text(&mut violations, "title", &draft.title);
        check_required_text(&mut violations, "author", &draft.author);

        if let Some(isbn) = &draft.isbn {
            if isbn.chars().count() > MAX_ISBN_LEN {
                violations.add("isbn", "must be at most 20 characters");
            }
        }
        if let Some(publisher) = &draft.publisher {
            if publisher.chars().count() > MAX_TEXT_LEN {
                violations.add("publisher", "must be at most 255 characters");
            }
        }
        if let Some(year) = draft.published_year {
            let current_year = i64::from(Utc::now().year());
            if !(MIN_PUBLISHED_YEAR..=current_year).contains(&year) {
                violations.add(
                    "published_year",
                    format!("must be between 1000 and {current_year}"),
                );
            }
        }
        if self.books.category(draft.category_id).await?.is_none() {
            violations.add("category_id", "must reference an existing category");
        }
        if let Some(upload) = cover {
            upload.check("cover_image", &mut violations);
        }

        violations.into_result()
    }
}

fn check_required_text(violations: &mut Violations, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        violations.add(field, "must not be empty");
    }
    if value.chars().count() > MAX_TEXT_LEN {
        violations.add(field, "must be at most 255 characters");
    }
}
