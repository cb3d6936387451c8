use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    book::{Book, BookId},
    poll::PollId,
};

/// Our choice IDs are integers.
pub type ChoiceId = u32;

/// One candidate book in one poll, carrying its running vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(rename = "_id")]
    pub id: ChoiceId,
    /// Foreign key poll ID.
    pub poll_id: PollId,
    /// Foreign key book ID.
    pub book_id: BookId,
    pub votes: u32,
}

impl Choice {
    pub fn new(id: ChoiceId, poll_id: PollId, book_id: BookId) -> Self {
        Self {
            id,
            poll_id,
            book_id,
            votes: 0,
        }
    }

    /// The vote count after adding `weight`, refusing counts that do not fit.
    pub fn votes_after(&self, weight: u32) -> Result<u32> {
        self.votes.checked_add(weight).ok_or_else(|| {
            Error::bad_request(format!(
                "Choice {} cannot take {weight} more votes on top of {}",
                self.id, self.votes
            ))
        })
    }
}

/// A choice joined with the book it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceResult {
    pub choice: Choice,
    pub book: Book,
}

#[cfg(test)]
mod tests {
    use rocket::http::Status;

    use super::*;

    #[test]
    fn votes_after_stops_at_the_limit() {
        let mut choice = Choice::new(1, 1, 1);
        assert_eq!(choice.votes_after(3).unwrap(), 3);

        choice.votes = u32::MAX - 1;
        assert_eq!(choice.votes_after(1).unwrap(), u32::MAX);
        assert!(matches!(
            choice.votes_after(2),
            Err(Error::Status(status, _)) if status == Status::BadRequest
        ));
    }
}
