use crate::error::Result;
use crate::model::{
    book::{Book, BookCore, BookFilter, BookId},
    choice::{Choice, ChoiceId},
    period::Period,
    poll::{Poll, PollId},
};

/// Persistence for the book club.
///
/// Every method is one atomic unit against the store. Methods that change a
/// poll's state re-check that state themselves, so a stale read in the caller
/// cannot finish a poll twice or count a ballot after the poll has closed.
#[rocket::async_trait]
pub trait BookClubStore: Send + Sync {
    /// Insert a new book, allocating its ID.
    async fn insert_book(&self, book: BookCore) -> Result<Book>;

    async fn book(&self, id: BookId) -> Result<Option<Book>>;

    async fn book_by_title(&self, title: &str) -> Result<Option<Book>>;

    /// Books matching the filter, in ID order.
    async fn books(&self, filter: BookFilter) -> Result<Vec<Book>>;

    /// The books with the given IDs that still exist, in ID order.
    async fn books_by_ids(&self, ids: &[BookId]) -> Result<Vec<Book>>;

    /// Is the book a candidate in any unfinished poll?
    async fn book_in_open_poll(&self, id: BookId) -> Result<bool>;

    /// Delete a book and every choice naming it. Returns false if there was no such book.
    async fn delete_book(&self, id: BookId) -> Result<bool>;

    /// Create an open poll together with one zero-vote choice per candidate.
    ///
    /// Fails with `DuplicatePoll` if this would be a second open primary poll for `date`.
    async fn insert_poll(&self, date: Period, primary: bool, candidates: &[BookId])
        -> Result<Poll>;

    async fn poll(&self, id: PollId) -> Result<Option<Poll>>;

    /// All polls in ID order, optionally only those with the given finished state.
    async fn polls(&self, finished: Option<bool>) -> Result<Vec<Poll>>;

    /// The unfinished primary poll for the period, if any.
    async fn open_primary_poll(&self, date: Period) -> Result<Option<Poll>>;

    /// Move a poll to another period. Returns false if there was no such poll.
    async fn set_poll_date(&self, id: PollId, date: Period) -> Result<bool>;

    /// Delete a poll and its choices. Returns false if there was no such poll.
    async fn delete_poll(&self, id: PollId) -> Result<bool>;

    /// The choices of a poll, in ID order.
    async fn choices(&self, poll: PollId) -> Result<Vec<Choice>>;

    /// Finish an open primary poll, veto the given books and open the run-off
    /// poll for the same period seeded with `candidates`. Returns the run-off poll.
    async fn finish_primary(
        &self,
        poll: PollId,
        vetoes: &[BookId],
        candidates: &[BookId],
    ) -> Result<Poll>;

    /// Finish an open secondary poll, retire the current book as read and make
    /// `winner` current. Returns the new current book.
    async fn finish_secondary(&self, poll: PollId, winner: BookId) -> Result<Book>;

    /// Add `weight` votes to a choice of an open poll.
    async fn add_votes(&self, poll: PollId, choice: ChoiceId, weight: u32) -> Result<Choice>;

    /// Record that a user voted in an open poll.
    ///
    /// Fails with `AlreadyVoted` if they already had.
    async fn add_voter(&self, poll: PollId, user: &str) -> Result<()>;

    /// Record a user's ballot: the voter and every weighted choice, all or nothing.
    async fn record_ballot(
        &self,
        poll: PollId,
        user: &str,
        weights: &[(ChoiceId, u32)],
    ) -> Result<()>;
}
