//! Data models.
//!
//! Database types are stored as-is; `api` holds the shapes sent over HTTP.

pub mod api;
pub mod auth;
pub mod ballot;
pub mod book;
pub mod choice;
pub mod mongodb;
pub mod period;
pub mod poll;
