use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{
    book::{Book, BookFilter},
    choice::ChoiceResult,
    period::Period,
    poll::{Poll, PollId},
};

use super::{
    tally::{leading_books, max_votes, runoff_candidates, vetoed_books},
    BookClub, BookClubStore,
};

/// What completing a poll led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// A primary poll finished and its run-off opened.
    Runoff(Poll),
    /// A run-off finished and this book is now being read.
    Selected(Book),
}

impl<S> BookClub<S>
where
    S: BookClubStore,
{
    /// Open the primary poll for a period, over every book eligible right now.
    ///
    /// Books that become eligible later are not added to the poll.
    pub async fn open_primary_poll(&self, period: Period) -> Result<Poll> {
        let _guard = self.coordinator.lock().await;

        if self.store.open_primary_poll(period).await?.is_some() {
            return Err(Error::DuplicatePoll(period));
        }
        let candidates: Vec<_> = self
            .store
            .books(BookFilter::Eligible)
            .await?
            .iter()
            .map(|book| book.id)
            .collect();
        if candidates.is_empty() {
            warn!("Opening primary poll for {period} with no eligible books");
        }

        let poll = self.store.insert_poll(period, true, &candidates).await?;
        info!(
            "Opened primary poll {} for {period} with {} candidates",
            poll.id,
            candidates.len()
        );
        Ok(poll)
    }

    /// Complete a poll, whichever kind it is.
    pub async fn complete_poll(&self, id: PollId) -> Result<Completion> {
        let _guard = self.coordinator.lock().await;

        let poll = self.require_open_poll(id).await?;
        if poll.primary {
            self.finish_primary(&poll).await.map(Completion::Runoff)
        } else {
            self.finish_secondary(&poll).await.map(Completion::Selected)
        }
    }

    /// Complete a primary poll, returning the run-off it opens.
    pub async fn complete_primary_poll(&self, id: PollId) -> Result<Poll> {
        let _guard = self.coordinator.lock().await;

        let poll = self.require_open_poll(id).await?;
        if !poll.primary {
            return Err(Error::bad_request(format!(
                "Poll {id} is a {} poll",
                poll.kind()
            )));
        }
        self.finish_primary(&poll).await
    }

    /// Complete a run-off poll, returning the book now being read.
    pub async fn complete_secondary_poll(&self, id: PollId) -> Result<Book> {
        let _guard = self.coordinator.lock().await;

        let poll = self.require_open_poll(id).await?;
        if poll.primary {
            return Err(Error::bad_request(format!(
                "Poll {id} is a {} poll",
                poll.kind()
            )));
        }
        self.finish_secondary(&poll).await
    }

    /// Every choice of a poll together with its book, in choice ID order.
    ///
    /// Choices whose book has since been removed from the catalog are skipped.
    pub async fn poll_results(&self, id: PollId) -> Result<Vec<ChoiceResult>> {
        self.require_poll(id).await?;

        let choices = self.store.choices(id).await?;
        let book_ids: Vec<_> = choices.iter().map(|c| c.book_id).collect();
        let books = self.store.books_by_ids(&book_ids).await?;

        Ok(choices
            .into_iter()
            .filter_map(|choice| {
                let book = books.iter().find(|b| b.id == choice.book_id)?.clone();
                Some(ChoiceResult { choice, book })
            })
            .collect())
    }

    pub async fn get_poll(&self, id: PollId) -> Result<Poll> {
        self.require_poll(id).await
    }

    /// All polls, or only the finished or unfinished ones.
    pub async fn list_polls(&self, finished: Option<bool>) -> Result<Vec<Poll>> {
        self.store.polls(finished).await
    }

    /// Move a poll to another period.
    pub async fn edit_poll_period(&self, id: PollId, period: Period) -> Result<Poll> {
        let _guard = self.coordinator.lock().await;

        let poll = self.require_poll(id).await?;
        if poll.primary && !poll.finished {
            if let Some(other) = self.store.open_primary_poll(period).await? {
                if other.id != id {
                    return Err(Error::DuplicatePoll(period));
                }
            }
        }
        if !self.store.set_poll_date(id, period).await? {
            return Err(Error::not_found(format!("Poll {id}")));
        }
        info!("Moved poll {id} from {} to {period}", poll.date);
        self.require_poll(id).await
    }

    /// Delete a poll and all of its choices.
    pub async fn delete_poll(&self, id: PollId) -> Result<()> {
        let _guard = self.coordinator.lock().await;

        if !self.store.delete_poll(id).await? {
            return Err(Error::not_found(format!("Poll {id}")));
        }
        info!("Deleted poll {id}");
        Ok(())
    }

    async fn finish_primary(&self, poll: &Poll) -> Result<Poll> {
        let choices = self.store.choices(poll.id).await?;
        let vetoes = vetoed_books(&choices);
        let leaders = self
            .store
            .books_by_ids(&leading_books(&choices))
            .await?;
        let candidates = runoff_candidates(&leaders, &vetoes);
        debug!(
            "Poll {}: lead of {} votes, vetoing {:?}, run-off over {:?}",
            poll.id,
            max_votes(&choices),
            vetoes,
            candidates
        );
        if candidates.is_empty() {
            warn!(
                "Poll {}: no book survives to the run-off for {}",
                poll.id, poll.date
            );
        }

        let runoff = self
            .store
            .finish_primary(poll.id, &vetoes, &candidates)
            .await?;
        info!(
            "Finished primary poll {}, vetoed {} books, opened run-off poll {}",
            poll.id,
            vetoes.len(),
            runoff.id
        );
        Ok(runoff)
    }

    async fn finish_secondary(&self, poll: &Poll) -> Result<Book> {
        let choices = self.store.choices(poll.id).await?;
        let winner = self.tie_break.winner(poll.id, &choices)?;

        let book = self.store.finish_secondary(poll.id, winner).await?;
        info!(
            "Finished run-off poll {}, now reading '{}' ({})",
            poll.id, book.spec.title, book.id
        );
        Ok(book)
    }
}
