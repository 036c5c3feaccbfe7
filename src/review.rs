//! Book reviews: one per user per book, with a 1..=5 rating and an
//! optional comment. A book's average rating is always computed from
//! its current review rows, never stored.

pub mod manager;
pub mod storage;
