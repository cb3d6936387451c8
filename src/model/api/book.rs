use rocket::FromForm;
use serde::{Deserialize, Serialize};

use crate::model::book::{Book, BookId};

/// An API-friendly book, with its catalog status flattened alongside its details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDescription {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub page_count: u32,
    pub description: String,
    pub image: String,
    pub read: bool,
    pub veto: bool,
    pub current: bool,
}

impl From<Book> for BookDescription {
    fn from(book: Book) -> Self {
        let id = book.id;
        let core = book.book;
        Self {
            id,
            title: core.spec.title,
            author: core.spec.author,
            page_count: core.spec.page_count,
            description: core.spec.description,
            image: core.spec.image,
            read: core.read,
            veto: core.veto,
            current: core.current,
        }
    }
}

/// Query parameters for looking a book up. The ID wins if both are given.
#[derive(Debug, Clone, FromForm)]
pub struct BookQuery {
    pub id: Option<BookId>,
    pub title: Option<String>,
}
