use log::debug;
use mongodb::{
    bson::{doc, Document},
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, ClientSession, Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    book::{Book, BookCore, BookFilter, BookId},
    choice::{Choice, ChoiceId},
    mongodb::{
        is_duplicate_key_error, u32_id_filter, Coll, Counter, BOOK_COUNTER, CHOICE_COUNTER,
        POLL_COUNTER,
    },
    period::Period,
    poll::{Poll, PollId},
};

use super::BookClubStore;

/// The production store. Multi-document writes run in a transaction, so the
/// database must be a replica set.
pub struct MongoStore {
    client: Client,
    books: Coll<Book>,
    polls: Coll<Poll>,
    choices: Coll<Choice>,
    counters: Coll<Counter>,
}

impl MongoStore {
    pub fn new(client: Client, db: &Database) -> Self {
        Self {
            client,
            books: Coll::from_db(db),
            polls: Coll::from_db(db),
            choices: Coll::from_db(db),
            counters: Coll::from_db(db),
        }
    }

    /// Start a session with an open transaction. Dropping the session
    /// without committing aborts the transaction.
    async fn transaction(&self) -> Result<ClientSession> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        Ok(session)
    }

    /// Insert a poll and its zero-vote choices as part of a transaction.
    async fn create_poll(
        &self,
        date: Period,
        primary: bool,
        candidates: &[BookId],
        session: &mut ClientSession,
    ) -> Result<Poll> {
        let id = Counter::next_with_session(&self.counters, POLL_COUNTER, session).await?;
        let poll = Poll::new(id, date, primary);
        self.polls
            .insert_one_with_session(&poll, None, session)
            .await
            .map_err(|err| duplicate_poll(err, date))?;

        let mut choices = Vec::with_capacity(candidates.len());
        for book_id in candidates {
            let choice_id =
                Counter::next_with_session(&self.counters, CHOICE_COUNTER, session).await?;
            choices.push(Choice::new(choice_id, id, *book_id));
        }
        // The driver refuses an empty batch.
        if !choices.is_empty() {
            self.choices
                .insert_many_with_session(&choices, None, session)
                .await?;
        }
        Ok(poll)
    }

    /// Explain why a conditional update of poll `id` matched nothing.
    async fn refusal(
        &self,
        id: PollId,
        user: Option<&str>,
        session: &mut ClientSession,
    ) -> Result<Error> {
        let poll = self
            .polls
            .find_one_with_session(u32_id_filter(id), None, session)
            .await?;
        Ok(match poll {
            None => Error::not_found(format!("Poll {id}")),
            Some(poll) if poll.finished => Error::PollFinished(id),
            Some(poll) => match user {
                Some(user) if poll.has_voter(user) => Error::AlreadyVoted {
                    poll: id,
                    user: user.to_string(),
                },
                _ => Error::bad_request(format!("Poll {id} is a {} poll", poll.kind())),
            },
        })
    }

    /// Explain why adding `weight` votes to a choice of poll `poll` matched nothing.
    async fn vote_refusal(
        &self,
        poll: PollId,
        choice: ChoiceId,
        weight: u32,
        session: &mut ClientSession,
    ) -> Result<Error> {
        let found = self
            .choices
            .find_one_with_session(doc! {"_id": choice, "poll_id": poll}, None, session)
            .await?;
        Ok(match found.map(|c| c.votes_after(weight)) {
            Some(Err(err)) => err,
            _ => Error::not_found(format!("Choice {choice} in poll {poll}")),
        })
    }

    /// Mark an open poll of the given kind as finished, returning it as it was.
    async fn finish(
        &self,
        id: PollId,
        primary: bool,
        session: &mut ClientSession,
    ) -> Result<Poll> {
        let filter = doc! {
            "_id": id,
            "primary": primary,
            "finished": false,
        };
        let update = doc! {
            "$set": { "finished": true }
        };
        match self
            .polls
            .find_one_and_update_with_session(filter, update, None, session)
            .await?
        {
            Some(poll) => Ok(poll),
            None => Err(self.refusal(id, None, session).await?),
        }
    }
}

/// Sort results by ID, which is also creation order.
fn by_id() -> FindOptions {
    FindOptions::builder().sort(doc! {"_id": 1}).build()
}

fn book_filter(filter: BookFilter) -> Document {
    match filter {
        BookFilter::All => doc! {},
        BookFilter::Eligible => doc! {
            "read": false,
            "veto": false,
            "current": false,
        },
        BookFilter::Current => doc! {"current": true},
    }
}

fn voter_filter(poll: PollId, user: &str) -> Document {
    doc! {
        "_id": poll,
        "finished": false,
        "voters": { "$ne": user },
    }
}

/// Match a choice of a poll only while `weight` more votes still fit its count.
fn vote_filter(poll: PollId, choice: ChoiceId, weight: u32) -> Document {
    doc! {
        "_id": choice,
        "poll_id": poll,
        "votes": {"$lte": u32::MAX - weight},
    }
}

fn push_voter(user: &str) -> Document {
    doc! {
        "$push": { "voters": user }
    }
}

/// The unique index on open primary polls reports a clash as a duplicate key.
fn duplicate_poll(err: DbError, date: Period) -> Error {
    if is_duplicate_key_error(&err) {
        Error::DuplicatePoll(date)
    } else {
        err.into()
    }
}

#[rocket::async_trait]
impl BookClubStore for MongoStore {
    async fn insert_book(&self, book: BookCore) -> Result<Book> {
        let id = Counter::next(&self.counters, BOOK_COUNTER).await?;
        let book = Book { id, book };
        self.books.insert_one(&book, None).await?;
        Ok(book)
    }

    async fn book(&self, id: BookId) -> Result<Option<Book>> {
        Ok(self.books.find_one(u32_id_filter(id), None).await?)
    }

    async fn book_by_title(&self, title: &str) -> Result<Option<Book>> {
        Ok(self.books.find_one(doc! {"title": title}, None).await?)
    }

    async fn books(&self, filter: BookFilter) -> Result<Vec<Book>> {
        let books = self
            .books
            .find(book_filter(filter), by_id())
            .await?
            .try_collect()
            .await?;
        Ok(books)
    }

    async fn books_by_ids(&self, ids: &[BookId]) -> Result<Vec<Book>> {
        let filter = doc! {
            "_id": { "$in": ids.to_vec() }
        };
        Ok(self.books.find(filter, by_id()).await?.try_collect().await?)
    }

    async fn book_in_open_poll(&self, id: BookId) -> Result<bool> {
        let open: Vec<PollId> = self
            .polls
            .find(doc! {"finished": false}, None)
            .await?
            .map_ok(|poll| poll.id)
            .try_collect()
            .await?;
        if open.is_empty() {
            return Ok(false);
        }
        let filter = doc! {
            "book_id": id,
            "poll_id": { "$in": open },
        };
        Ok(self.choices.count_documents(filter, None).await? > 0)
    }

    async fn delete_book(&self, id: BookId) -> Result<bool> {
        let mut session = self.transaction().await?;
        let deleted = self
            .books
            .delete_one_with_session(u32_id_filter(id), None, &mut session)
            .await?;
        if deleted.deleted_count == 0 {
            return Ok(false);
        }
        let cascade = self
            .choices
            .delete_many_with_session(doc! {"book_id": id}, None, &mut session)
            .await?;
        session.commit_transaction().await?;
        debug!(
            "Deleted book {id} and {} of its choices",
            cascade.deleted_count
        );
        Ok(true)
    }

    async fn insert_poll(
        &self,
        date: Period,
        primary: bool,
        candidates: &[BookId],
    ) -> Result<Poll> {
        let mut session = self.transaction().await?;
        let poll = self
            .create_poll(date, primary, candidates, &mut session)
            .await?;
        session
            .commit_transaction()
            .await
            .map_err(|err| duplicate_poll(err, date))?;
        Ok(poll)
    }

    async fn poll(&self, id: PollId) -> Result<Option<Poll>> {
        Ok(self.polls.find_one(u32_id_filter(id), None).await?)
    }

    async fn polls(&self, finished: Option<bool>) -> Result<Vec<Poll>> {
        let filter = finished.map(|finished| doc! {"finished": finished});
        Ok(self.polls.find(filter, by_id()).await?.try_collect().await?)
    }

    async fn open_primary_poll(&self, date: Period) -> Result<Option<Poll>> {
        let filter = doc! {
            "date": date,
            "primary": true,
            "finished": false,
        };
        Ok(self.polls.find_one(filter, None).await?)
    }

    async fn set_poll_date(&self, id: PollId, date: Period) -> Result<bool> {
        let update = doc! {
            "$set": { "date": date }
        };
        let result = self
            .polls
            .update_one(u32_id_filter(id), update, None)
            .await
            .map_err(|err| duplicate_poll(err, date))?;
        Ok(result.matched_count > 0)
    }

    async fn delete_poll(&self, id: PollId) -> Result<bool> {
        let mut session = self.transaction().await?;
        let deleted = self
            .polls
            .delete_one_with_session(u32_id_filter(id), None, &mut session)
            .await?;
        if deleted.deleted_count == 0 {
            return Ok(false);
        }
        self.choices
            .delete_many_with_session(doc! {"poll_id": id}, None, &mut session)
            .await?;
        session.commit_transaction().await?;
        Ok(true)
    }

    async fn choices(&self, poll: PollId) -> Result<Vec<Choice>> {
        let choices = self
            .choices
            .find(doc! {"poll_id": poll}, by_id())
            .await?
            .try_collect()
            .await?;
        Ok(choices)
    }

    async fn finish_primary(
        &self,
        poll: PollId,
        vetoes: &[BookId],
        candidates: &[BookId],
    ) -> Result<Poll> {
        let mut session = self.transaction().await?;
        let primary = self.finish(poll, true, &mut session).await?;

        if !vetoes.is_empty() {
            let filter = doc! {
                "_id": { "$in": vetoes.to_vec() }
            };
            let update = doc! {
                "$set": { "veto": true }
            };
            self.books
                .update_many_with_session(filter, update, None, &mut session)
                .await?;
        }

        let runoff = self
            .create_poll(primary.date, false, candidates, &mut session)
            .await?;
        session.commit_transaction().await?;
        Ok(runoff)
    }

    async fn finish_secondary(&self, poll: PollId, winner: BookId) -> Result<Book> {
        let mut session = self.transaction().await?;
        self.finish(poll, false, &mut session).await?;

        let retire = doc! {
            "$set": { "current": false, "read": true }
        };
        self.books
            .update_many_with_session(doc! {"current": true}, retire, None, &mut session)
            .await?;

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let book = self
            .books
            .find_one_and_update_with_session(
                u32_id_filter(winner),
                doc! {"$set": {"current": true}},
                options,
                &mut session,
            )
            .await?
            .ok_or_else(|| Error::not_found(format!("Book {winner}")))?;
        session.commit_transaction().await?;
        Ok(book)
    }

    async fn add_votes(&self, poll: PollId, choice: ChoiceId, weight: u32) -> Result<Choice> {
        let mut session = self.transaction().await?;
        let open = self
            .polls
            .find_one_with_session(doc! {"_id": poll, "finished": false}, None, &mut session)
            .await?;
        if open.is_none() {
            return Err(self.refusal(poll, None, &mut session).await?);
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let updated = self
            .choices
            .find_one_and_update_with_session(
                vote_filter(poll, choice, weight),
                doc! {"$inc": {"votes": weight}},
                options,
                &mut session,
            )
            .await?;
        let Some(updated) = updated else {
            return Err(self.vote_refusal(poll, choice, weight, &mut session).await?);
        };
        session.commit_transaction().await?;
        Ok(updated)
    }

    async fn add_voter(&self, poll: PollId, user: &str) -> Result<()> {
        let mut session = self.transaction().await?;
        let result = self
            .polls
            .update_one_with_session(voter_filter(poll, user), push_voter(user), None, &mut session)
            .await?;
        if result.matched_count == 0 {
            return Err(self.refusal(poll, Some(user), &mut session).await?);
        }
        session.commit_transaction().await?;
        Ok(())
    }

    async fn record_ballot(
        &self,
        poll: PollId,
        user: &str,
        weights: &[(ChoiceId, u32)],
    ) -> Result<()> {
        let mut session = self.transaction().await?;
        let result = self
            .polls
            .update_one_with_session(voter_filter(poll, user), push_voter(user), None, &mut session)
            .await?;
        if result.matched_count == 0 {
            return Err(self.refusal(poll, Some(user), &mut session).await?);
        }

        for &(choice, weight) in weights {
            let result = self
                .choices
                .update_one_with_session(
                    vote_filter(poll, choice, weight),
                    doc! {"$inc": {"votes": weight}},
                    None,
                    &mut session,
                )
                .await?;
            if result.matched_count == 0 {
                return Err(self.vote_refusal(poll, choice, weight, &mut session).await?);
            }
        }
        session.commit_transaction().await?;
        Ok(())
    }
}
