//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - Periods are serialised as `YYYY-MM` strings, alongside a readable label.
//! - Choices carry the book they stand for.

pub mod book;
pub mod poll;
pub mod summary;
