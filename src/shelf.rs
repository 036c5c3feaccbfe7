//! Per-user reading shelves.
//!
//! Each user tracks each book independently as `want_to_read`,
//! `currently_reading`, or `read`: at most one shelf entry per
//! (user, book) pair, overwritten in place on reassignment. The
//! uniqueness lives in the database as a unique index plus an upsert,
//! not as an application-level check, so concurrent assignments for
//! the same pair cannot duplicate rows.

pub mod manager;
pub mod storage;
