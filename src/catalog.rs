//! The book catalog: browsing, searching, and catalog management.
//!
//! The catalog is the global set of books, independent of any user's
//! shelf state. Reads (listing, searching, detail pages) are public;
//! creating, updating, and deleting books or categories requires
//! catalog-management rights on the caller's [`Principal`].
//!
//! Listing and search are paginated at a fixed page size with results
//! ordered newest-first. Search is a case-insensitive substring match
//! over title, author, and description, optionally intersected with an
//! exact category filter; both filters are optional and combinable.
//!
//! [`Principal`]: crate::auth::Principal

pub mod manager;
pub mod storage;
