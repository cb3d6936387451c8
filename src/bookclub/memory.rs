//! An in-process store, used to exercise the engine without a database.

use std::collections::BTreeMap;

use rocket::tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{
    book::{Book, BookCore, BookFilter, BookId, BookSpec},
    choice::{Choice, ChoiceId},
    period::Period,
    poll::{Poll, PollId},
};

use super::{BookClub, BookClubStore, TieBreak};

#[derive(Default)]
struct State {
    books: BTreeMap<BookId, Book>,
    polls: BTreeMap<PollId, Poll>,
    choices: BTreeMap<ChoiceId, Choice>,
    last_book: BookId,
    last_poll: PollId,
    last_choice: ChoiceId,
}

impl State {
    fn open_poll(&mut self, id: PollId) -> Result<&mut Poll> {
        let poll = self
            .polls
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("Poll {}", id)))?;
        if poll.finished {
            return Err(Error::PollFinished(id));
        }
        Ok(poll)
    }

    fn create_poll(&mut self, date: Period, primary: bool, candidates: &[BookId]) -> Result<Poll> {
        let duplicate = primary
            && self
                .polls
                .values()
                .any(|p| p.primary && !p.finished && p.date == date);
        if duplicate {
            return Err(Error::DuplicatePoll(date));
        }
        self.last_poll += 1;
        let poll = Poll::new(self.last_poll, date, primary);
        for book_id in candidates {
            self.last_choice += 1;
            self.choices
                .insert(self.last_choice, Choice::new(self.last_choice, poll.id, *book_id));
        }
        self.polls.insert(poll.id, poll.clone());
        Ok(poll)
    }

    fn choice_in_poll(&mut self, poll: PollId, choice: ChoiceId) -> Result<&mut Choice> {
        self.choices
            .get_mut(&choice)
            .filter(|c| c.poll_id == poll)
            .ok_or_else(|| Error::not_found(format!("Choice {} in poll {}", choice, poll)))
    }
}

/// A [`BookClubStore`] holding everything in memory behind a lock.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[rocket::async_trait]
impl BookClubStore for MemoryStore {
    async fn insert_book(&self, book: BookCore) -> Result<Book> {
        let mut state = self.state.lock().await;
        state.last_book += 1;
        let book = Book {
            id: state.last_book,
            book,
        };
        state.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn book(&self, id: BookId) -> Result<Option<Book>> {
        Ok(self.state.lock().await.books.get(&id).cloned())
    }

    async fn book_by_title(&self, title: &str) -> Result<Option<Book>> {
        let state = self.state.lock().await;
        Ok(state.books.values().find(|b| b.spec.title == title).cloned())
    }

    async fn books(&self, filter: BookFilter) -> Result<Vec<Book>> {
        let state = self.state.lock().await;
        Ok(state
            .books
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect())
    }

    async fn books_by_ids(&self, ids: &[BookId]) -> Result<Vec<Book>> {
        let state = self.state.lock().await;
        Ok(state
            .books
            .values()
            .filter(|b| ids.contains(&b.id))
            .cloned()
            .collect())
    }

    async fn book_in_open_poll(&self, id: BookId) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state.choices.values().any(|c| {
            c.book_id == id && state.polls.get(&c.poll_id).map_or(false, |p| !p.finished)
        }))
    }

    async fn delete_book(&self, id: BookId) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.books.remove(&id).is_none() {
            return Ok(false);
        }
        state.choices.retain(|_, c| c.book_id != id);
        Ok(true)
    }

    async fn insert_poll(
        &self,
        date: Period,
        primary: bool,
        candidates: &[BookId],
    ) -> Result<Poll> {
        self.state
            .lock()
            .await
            .create_poll(date, primary, candidates)
    }

    async fn poll(&self, id: PollId) -> Result<Option<Poll>> {
        Ok(self.state.lock().await.polls.get(&id).cloned())
    }

    async fn polls(&self, finished: Option<bool>) -> Result<Vec<Poll>> {
        let state = self.state.lock().await;
        Ok(state
            .polls
            .values()
            .filter(|p| finished.map_or(true, |f| p.finished == f))
            .cloned()
            .collect())
    }

    async fn open_primary_poll(&self, date: Period) -> Result<Option<Poll>> {
        let state = self.state.lock().await;
        Ok(state
            .polls
            .values()
            .find(|p| p.primary && !p.finished && p.date == date)
            .cloned())
    }

    async fn set_poll_date(&self, id: PollId, date: Period) -> Result<bool> {
        let mut state = self.state.lock().await;
        let clash = state
            .polls
            .values()
            .any(|p| p.id != id && p.primary && !p.finished && p.date == date);
        match state.polls.get_mut(&id) {
            Some(poll) => {
                if clash && poll.primary && !poll.finished {
                    return Err(Error::DuplicatePoll(date));
                }
                poll.date = date;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_poll(&self, id: PollId) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.polls.remove(&id).is_none() {
            return Ok(false);
        }
        state.choices.retain(|_, c| c.poll_id != id);
        Ok(true)
    }

    async fn choices(&self, poll: PollId) -> Result<Vec<Choice>> {
        let state = self.state.lock().await;
        Ok(state
            .choices
            .values()
            .filter(|c| c.poll_id == poll)
            .cloned()
            .collect())
    }

    async fn finish_primary(
        &self,
        poll: PollId,
        vetoes: &[BookId],
        candidates: &[BookId],
    ) -> Result<Poll> {
        let mut state = self.state.lock().await;
        let primary = state.open_poll(poll)?;
        if !primary.primary {
            return Err(Error::bad_request(format!("Poll {} is not a primary poll", poll)));
        }
        primary.finished = true;
        let date = primary.date;
        for id in vetoes {
            if let Some(book) = state.books.get_mut(id) {
                book.veto = true;
            }
        }
        state.create_poll(date, false, candidates)
    }

    async fn finish_secondary(&self, poll: PollId, winner: BookId) -> Result<Book> {
        let mut state = self.state.lock().await;
        if state.open_poll(poll)?.primary {
            return Err(Error::bad_request(format!("Poll {} is not a secondary poll", poll)));
        }
        if !state.books.contains_key(&winner) {
            return Err(Error::not_found(format!("Book {}", winner)));
        }
        state.open_poll(poll)?.finished = true;
        for book in state.books.values_mut().filter(|b| b.current) {
            book.current = false;
            book.read = true;
        }
        let book = state
            .books
            .get_mut(&winner)
            .ok_or_else(|| Error::not_found(format!("Book {}", winner)))?;
        book.current = true;
        Ok(book.clone())
    }

    async fn add_votes(&self, poll: PollId, choice: ChoiceId, weight: u32) -> Result<Choice> {
        let mut state = self.state.lock().await;
        state.open_poll(poll)?;
        let choice = state.choice_in_poll(poll, choice)?;
        choice.votes = choice.votes_after(weight)?;
        Ok(choice.clone())
    }

    async fn add_voter(&self, poll: PollId, user: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let poll = state.open_poll(poll)?;
        if poll.has_voter(user) {
            return Err(Error::AlreadyVoted {
                poll: poll.id,
                user: user.to_string(),
            });
        }
        poll.voters.push(user.to_string());
        Ok(())
    }

    async fn record_ballot(
        &self,
        poll: PollId,
        user: &str,
        weights: &[(ChoiceId, u32)],
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.open_poll(poll)?.has_voter(user) {
            return Err(Error::AlreadyVoted {
                poll,
                user: user.to_string(),
            });
        }
        // Check every choice before touching anything.
        for (choice, weight) in weights {
            state.choice_in_poll(poll, *choice)?.votes_after(*weight)?;
        }
        for (choice, weight) in weights {
            let choice = state.choice_in_poll(poll, *choice)?;
            choice.votes = choice.votes_after(*weight)?;
        }
        state.open_poll(poll)?.voters.push(user.to_string());
        Ok(())
    }
}

/// The engine over an in-memory store.
pub type MemoryBookClub = BookClub<MemoryStore>;

impl MemoryBookClub {
    /// An engine over an empty in-memory store.
    pub fn in_memory(tie_break: TieBreak) -> Self {
        log4rs_test_utils::test_logging::init_logging_once_for(["bookclub_backend"], None, None);
        Self::new(MemoryStore::default(), tie_break)
    }

    /// An engine whose catalog holds one example book per title, in ID order.
    pub async fn with_books(titles: &[&str]) -> (Self, Vec<Book>) {
        let club = Self::in_memory(TieBreak::default());
        let mut books = Vec::new();
        for title in titles {
            books.push(club.add_book(BookSpec::example(title)).await.unwrap());
        }
        (club, books)
    }
}
