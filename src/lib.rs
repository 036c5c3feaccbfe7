//! # biblio_core
//!
//! The domain core of a book-cataloguing application: a public catalog
//! of books and categories, per-user reading shelves, one-review-per-
//! book reviews, and profile management, persisted in SQLite through a
//! single async connection pool.
//!
//! ## Features
//!
//! - **Catalog**: paginated newest-first listing, combinable
//!   substring/category search, and authorized book/category management
//!   with cover-image storage
//! - **Shelves**: one shelf entry per (user, book) pair, upserted in
//!   place on reassignment, enforced by the store
//! - **Reviews**: one review per (user, book) pair with a 1..=5 rating;
//!   average ratings derived on read
//! - **Profiles**: registration, credential verification, and profile
//!   updates gated on the current password
//! - **Explicit identity**: every protected operation takes an
//!   [`auth::Principal`] instead of reading ambient session state
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use biblio_core::auth::Principal;
//! use biblio_core::catalog::manager::CatalogManager;
//! use biblio_core::catalog::storage::BookDraft;
//! use biblio_core::db::Database;
//! use biblio_core::media::MediaStore;
//!
//! # async fn run() -> Result<(), biblio_core::BiblioError> {
//! let db = Database::open(std::path::Path::new("biblio.db")).await?;
//! let media = MediaStore::new("public")?;
//! let catalog = CatalogManager::new(db.pool().clone(), media);
//!
//! let admin = Principal::admin(1);
//! let fiction = catalog.create_category(&admin, "Fiction").await?;
//!
//! let book = catalog
//!     .create_book(
//!         &admin,
//!         BookDraft {
//!             title: "Dune".to_string(),
//!             author: "Frank Herbert".to_string(),
//!             category_id: fiction.id,
//!             ..Default::default()
//!         },
//!         None,
//!     )
//!     .await?;
//!
//! let page = catalog.search_books(Some("dune"), None, 1).await?;
//! assert_eq!(page.items[0].book.id, book.id);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Each area splits into a storage type owning the SQL and a manager
//! holding the domain rules on top of it:
//!
//! - **[`db`]**: pool construction and schema
//! - **[`catalog`]**: books and categories
//! - **[`shelf`]**: per-user reading status
//! - **[`review`]**: ratings and comments
//! - **[`profile`]**: user accounts
//! - **[`media`]**: stored cover images and profile pictures
//! - **[`auth`]**: caller identity and pure authorization checks
//! - **[`error`]**: the unified error type
//!
//! ## Error Handling
//!
//! All operations return [`BiblioResult<T>`] wrapping [`BiblioError`].
//! Validation failures carry every violated field; uniqueness races
//! lost at the store surface as `Duplicate`, never as raw database
//! faults.

pub mod auth;
pub mod catalog;
pub mod db;
pub mod error;
pub mod media;
pub mod profile;
pub mod review;
pub mod shelf;

/// Re-exports the most commonly used types for convenience.
pub use error::{BiblioError, BiblioResult};
