use biblio_core::auth::Principal;
use biblio_core::catalog::manager::CatalogManager;
use biblio_core::catalog::storage::{Book, BookDraft};
use biblio_core::db::Database;
use biblio_core::error::BiblioError;
use biblio_core::media::MediaStore;
use biblio_core::profile::manager::ProfileManager;
use biblio_core::review::manager::ReviewManager;
use tempfile::TempDir;

struct Fixture {
    catalog: CatalogManager,
    reviews: ReviewManager,
    profiles: ProfileManager,
    book: Book,
}

async fn setup(tmp: &TempDir) -> Result<Fixture, BiblioError> {
    let db = Database::open(&tmp.path().join("test.db")).await?;
    let media = MediaStore::new(tmp.path().join("media"))?;
    let catalog = CatalogManager::new(db.pool().clone(), media.clone());
    let profiles = ProfileManager::new(db.pool().clone(), media);
    let admin = Principal::admin(1);

    let category = catalog.create_category(&admin, "Fiction").await?;
    let book = catalog
        .create_book(
            &admin,
            BookDraft {
                title: "Dune".to_string(),
                author: "Frank Herbert".to_string(),
                category_id: category.id,
                ..Default::default()
            },
            None,
        )
        .await?;

    Ok(Fixture {
        catalog,
        reviews: ReviewManager::new(db.pool().clone()),
        profiles,
        book,
    })
}

impl Fixture {
    async fn register_reader(&self, email: &str) -> Result<Principal, BiblioError> {
        let user = self
            .profiles
            .register("Reader", email, "secret-password")
            .await?;
        Ok(Principal::member(user.id))
    }
}

#[tokio::test]
async fn average_rating_is_the_mean_of_current_reviews() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let fx = setup(&tmp).await?;

    assert_eq!(fx.reviews.average_rating(fx.book.id).await?, 0.0);

    let first = fx.register_reader("first@example.com").await?;
    let second = fx.register_reader("second@example.com").await?;
    fx.reviews.add(&first, fx.book.id, 2, None).await?;
    fx.reviews
        .add(&second, fx.book.id, 5, Some("Great".to_string()))
        .await?;

    assert_eq!(fx.reviews.average_rating(fx.book.id).await?, 3.5);
    assert_eq!(fx.reviews.review_count(fx.book.id).await?, 2);

    Ok(())
}

#[tokio::test]
async fn rating_bounds_are_inclusive() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let fx = setup(&tmp).await?;

    let low = fx.register_reader("low@example.com").await?;
    let high = fx.register_reader("high@example.com").await?;
    let out = fx.register_reader("out@example.com").await?;

    fx.reviews.add(&low, fx.book.id, 1, None).await?;
    fx.reviews.add(&high, fx.book.id, 5, None).await?;

    for bad in [0, 6] {
        let result = fx.reviews.add(&out, fx.book.id, bad, None).await;
        match result {
            Err(BiblioError::Validation(violations)) => {
                assert!(violations.as_slice().iter().any(|v| v.field == "rating"));
            }
            other => panic!("expected validation failure for {bad}, got {other:?}"),
        }
    }

    Ok(())
}

#[tokio::test]
async fn second_review_is_rejected_and_original_kept() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let fx = setup(&tmp).await?;
    let reader = fx.register_reader("reader@example.com").await?;

    fx.reviews
        .add(&reader, fx.book.id, 4, Some("First impression".to_string()))
        .await?;

    let result = fx.reviews.add(&reader, fx.book.id, 1, None).await;
    assert!(matches!(result, Err(BiblioError::Duplicate(_))));

    // the original review is untouched
    let detail = fx.catalog.get_book(fx.book.id, Some(&reader)).await?;
    let own = detail.viewer_review.expect("review still present");
    assert_eq!(own.rating, 4);
    assert_eq!(own.comment.as_deref(), Some("First impression"));
    assert_eq!(detail.review_count, 1);

    Ok(())
}

#[tokio::test]
async fn editing_overwrites_rating_and_comment_in_place() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let fx = setup(&tmp).await?;
    let reader = fx.register_reader("reader@example.com").await?;

    let review = fx.reviews.add(&reader, fx.book.id, 2, None).await?;
    let edited = fx
        .reviews
        .edit(&reader, review.id, 5, Some("Grew on me".to_string()))
        .await?;

    assert_eq!(edited.id, review.id);
    assert_eq!(edited.rating, 5);
    assert_eq!(edited.comment.as_deref(), Some("Grew on me"));
    assert_eq!(edited.user_id, review.user_id);
    assert_eq!(edited.book_id, review.book_id);

    Ok(())
}

#[tokio::test]
async fn editing_revalidates_the_rating() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let fx = setup(&tmp).await?;
    let reader = fx.register_reader("reader@example.com").await?;

    let review = fx.reviews.add(&reader, fx.book.id, 3, None).await?;
    let result = fx.reviews.edit(&reader, review.id, 6, None).await;
    assert!(matches!(result, Err(BiblioError::Validation(_))));

    Ok(())
}

#[tokio::test]
async fn editing_requires_ownership() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let fx = setup(&tmp).await?;
    let owner = fx.register_reader("owner@example.com").await?;
    let stranger = fx.register_reader("stranger@example.com").await?;

    let review = fx.reviews.add(&owner, fx.book.id, 3, None).await?;
    let result = fx.reviews.edit(&stranger, review.id, 5, None).await;
    assert!(matches!(result, Err(BiblioError::Forbidden(_))));

    Ok(())
}

#[tokio::test]
async fn deletion_allows_owner_and_admin_override() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let fx = setup(&tmp).await?;
    let owner = fx.register_reader("owner@example.com").await?;
    let stranger = fx.register_reader("stranger@example.com").await?;
    let admin = Principal::admin(1);

    let review = fx.reviews.add(&owner, fx.book.id, 3, None).await?;

    let denied = fx.reviews.delete(&stranger, review.id).await;
    assert!(matches!(denied, Err(BiblioError::Forbidden(_))));

    fx.reviews.delete(&owner, review.id).await?;
    assert_eq!(fx.reviews.review_count(fx.book.id).await?, 0);

    // a moderator removes someone else's review
    let review = fx.reviews.add(&owner, fx.book.id, 2, None).await?;
    fx.reviews.delete(&admin, review.id).await?;
    assert_eq!(fx.reviews.review_count(fx.book.id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn reviewing_a_missing_book_is_not_found() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let fx = setup(&tmp).await?;
    let reader = fx.register_reader("reader@example.com").await?;

    let result = fx.reviews.add(&reader, 9999, 4, None).await;
    assert!(matches!(result, Err(BiblioError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn deleting_a_review_lowers_the_average() -> Result<(), BiblioError> {
    let tmp = TempDir::new().unwrap();
    let fx = setup(&tmp).await?;
    let first = fx.register_reader("first@example.com").await?;
    let second = fx.register_reader("second@example.com").await?;

    fx.reviews.add(&first, fx.book.id, 5, None).await?;
    let low = fx.reviews.add(&second, fx.book.id, 1, None).await?;
    assert_eq!(fx.reviews.average_rating(fx.book.id).await?, 3.0);

    fx.reviews.delete(&second, low.id).await?;
    assert_eq!(fx.reviews.average_rating(fx.book.id).await?, 5.0);

    Ok(())
}
