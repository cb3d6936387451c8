use serde::{Deserialize, Serialize};

use crate::bookclub::Summary;
use crate::model::api::{book::BookDescription, poll::PollSummary};

/// Everything a member sees on arriving at the book club.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookClubSummary {
    pub current_book: Option<BookDescription>,
    pub open_polls: Vec<PollSummary>,
    pub eligible_books: Vec<BookDescription>,
}

impl From<Summary> for BookClubSummary {
    fn from(summary: Summary) -> Self {
        Self {
            current_book: summary.current_book.map(Into::into),
            open_polls: summary.open_polls.into_iter().map(Into::into).collect(),
            eligible_books: summary.eligible_books.into_iter().map(Into::into).collect(),
        }
    }
}
