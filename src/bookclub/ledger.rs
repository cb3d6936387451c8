use log::{debug, info};

use crate::error::{Error, Result};
use crate::model::{
    ballot::Ballot,
    choice::{Choice, ChoiceId},
    poll::PollId,
};

use super::{BookClub, BookClubStore};

impl<S> BookClub<S>
where
    S: BookClubStore,
{
    /// Add `weight` votes to a choice of an open poll.
    ///
    /// This does not record a voter; [`Self::submit_ballot`] does both.
    pub async fn cast_vote(&self, poll: PollId, choice: ChoiceId, weight: u32) -> Result<Choice> {
        if weight == 0 {
            return Err(Error::bad_request("Vote weight must be positive"));
        }
        let _guard = self.coordinator.lock().await;

        self.require_open_poll(poll).await?;
        let current = self
            .store
            .choices(poll)
            .await?
            .into_iter()
            .find(|c| c.id == choice)
            .ok_or_else(|| Error::not_found(format!("Choice {choice} in poll {poll}")))?;
        current.votes_after(weight)?;

        let choice = self.store.add_votes(poll, choice, weight).await?;
        debug!(
            "Poll {poll}: choice {} now has {} votes",
            choice.id, choice.votes
        );
        Ok(choice)
    }

    /// Record that a user has voted in an open poll, failing if they already had.
    pub async fn record_voter(&self, poll: PollId, user: &str) -> Result<()> {
        check_user(user)?;
        let _guard = self.coordinator.lock().await;

        self.require_open_poll(poll).await?;
        self.store.add_voter(poll, user).await
    }

    pub async fn has_voted(&self, poll: PollId, user: &str) -> Result<bool> {
        Ok(self.require_poll(poll).await?.has_voter(user))
    }

    /// Count a user's ballot in an open poll, once.
    ///
    /// The ballot must suit the kind of poll and name only its choices.
    /// Either every vote and the voter are recorded, or none are.
    pub async fn submit_ballot(&self, poll: PollId, user: &str, ballot: &Ballot) -> Result<()> {
        check_user(user)?;
        let weights = ballot.weights()?;
        let _guard = self.coordinator.lock().await;

        let target = self.require_open_poll(poll).await?;
        if target.has_voter(user) {
            return Err(Error::AlreadyVoted {
                poll,
                user: user.to_string(),
            });
        }
        ballot.check_kind(target.primary)?;

        let choices = self.store.choices(poll).await?;
        for &(id, weight) in &weights {
            choices
                .iter()
                .find(|c| c.id == id)
                .ok_or_else(|| Error::not_found(format!("Choice {id} in poll {poll}")))?
                .votes_after(weight)?;
        }

        self.store.record_ballot(poll, user, &weights).await?;
        info!(
            "Counted {} ballot from '{user}' in poll {poll} over {} choices",
            ballot.kind(),
            weights.len()
        );
        Ok(())
    }
}

fn check_user(user: &str) -> Result<()> {
    if user.trim().is_empty() {
        return Err(Error::bad_request("Voter must be identified"));
    }
    Ok(())
}
