use crate::auth::{self, Principal};
use crate::catalog::storage::CatalogStorage;
use crate::error::{BiblioError, BiblioResult, Violations};
use crate::review::storage::{Review, ReviewStorage, ReviewWithAuthor};
use sqlx::SqlitePool;

const MIN_RATING: i64 = 1;
const MAX_RATING: i64 = 5;

fn validate_rating(rating: i64) -> BiblioResult<()> {
    let mut violations = Violations::new();
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        violations.add("rating", "must be an integer between 1 and 5");
    }
    violations.into_result()
}

/// High-level review operations: one review per user per book.
pub struct ReviewManager {
    reviews: ReviewStorage,
    catalog: CatalogStorage,
}

impl ReviewManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            reviews: ReviewStorage::new(pool.clone()),
            catalog: CatalogStorage::new(pool),
        }
    }

    /// Posts the caller's review of a book.
    ///
    /// Fails with a validation error for an out-of-range rating, and
    /// with [`BiblioError::Duplicate`] if the caller already reviewed
    /// this book; editing the existing review is the recovery path.
    pub async fn add(
        &self,
        principal: &Principal,
        book_id: i64,
        rating: i64,
        comment: Option<String>,
    ) -> BiblioResult<Review> {
        validate_rating(rating)?;

        if self.catalog.book(book_id).await?.is_none() {
            return Err(BiblioError::NotFound("book"));
        }

        let review = self
            .reviews
            .insert(principal.user_id, book_id, rating, comment.as_deref())
            .await?;
        tracing::info!(
            user_id = principal.user_id,
            book_id,
            rating,
            "review added"
        );
        Ok(review)
    }

    /// Overwrites the rating and comment of a review the caller owns.
    pub async fn edit(
        &self,
        principal: &Principal,
        review_id: i64,
        rating: i64,
        comment: Option<String>,
    ) -> BiblioResult<Review> {
        let review = self
            .reviews
            .review(review_id)
            .await?
            .ok_or(BiblioError::NotFound("review"))?;
        auth::require_owner(principal, review.user_id, "review")?;
        validate_rating(rating)?;

        self.reviews
            .update(review_id, rating, comment.as_deref())
            .await?;
        self.reviews
            .review(review_id)
            .await?
            .ok_or(BiblioError::NotFound("review"))
    }

    /// Deletes a review. Owners may delete their own; admins may delete
    /// anyone's.
    pub async fn delete(&self, principal: &Principal, review_id: i64) -> BiblioResult<()> {
        let review = self
            .reviews
            .review(review_id)
            .await?
            .ok_or(BiblioError::NotFound("review"))?;
        auth::require_owner_or_admin(principal, review.user_id, "review")?;

        self.reviews.delete(review_id).await?;
        tracing::info!(
            user_id = principal.user_id,
            review_id,
            book_id = review.book_id,
            "review deleted"
        );
        Ok(())
    }

    /// All reviews of a book with their authors, newest first.
    pub async fn book_reviews(&self, book_id: i64) -> BiblioResult<Vec<ReviewWithAuthor>> {
        self.reviews.for_book(book_id).await
    }

    /// Mean rating over the book's current reviews, 0 with none.
    pub async fn average_rating(&self, book_id: i64) -> BiblioResult<f64> {
        self.reviews.average_rating(book_id).await
    }

    pub async fn review_count(&self, book_id: i64) -> BiblioResult<i64> {
        self.reviews.count_for(book_id).await
    }
}
