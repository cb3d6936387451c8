use serde::{Deserialize, Serialize};

use crate::bookclub::Completion;
use crate::model::{
    api::book::BookDescription,
    choice::{ChoiceId, ChoiceResult},
    period::Period,
    poll::{Poll, PollId},
};

/// A poll without its choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSummary {
    pub id: PollId,
    pub period: Period,
    /// The period as shown to members, e.g. "January 2024".
    pub label: String,
    pub primary: bool,
    pub finished: bool,
    /// How many members have voted. Who they are is not disclosed.
    pub voter_count: usize,
}

impl From<Poll> for PollSummary {
    fn from(poll: Poll) -> Self {
        Self {
            id: poll.id,
            period: poll.date,
            label: poll.date.label(),
            primary: poll.primary,
            finished: poll.finished,
            voter_count: poll.voters.len(),
        }
    }
}

/// One candidate of a poll, with its running total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceDescription {
    pub id: ChoiceId,
    pub votes: u32,
    pub book: BookDescription,
}

impl From<ChoiceResult> for ChoiceDescription {
    fn from(result: ChoiceResult) -> Self {
        Self {
            id: result.choice.id,
            votes: result.choice.votes,
            book: result.book.into(),
        }
    }
}

/// A poll with its choices, as seen by one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollDescription {
    #[serde(flatten)]
    pub poll: PollSummary,
    pub choices: Vec<ChoiceDescription>,
    /// Has the requesting member already voted in this poll?
    pub has_voted: bool,
}

/// Body of requests that open a poll or move it to another period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollRequest {
    pub period: Period,
}

/// The outcome of completing a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompletionDescription {
    /// The run-off opened by a primary poll.
    Runoff { poll: PollSummary },
    /// The book chosen by a run-off.
    Selected { book: BookDescription },
}

impl From<Completion> for CompletionDescription {
    fn from(completion: Completion) -> Self {
        match completion {
            Completion::Runoff(poll) => Self::Runoff { poll: poll.into() },
            Completion::Selected(book) => Self::Selected { book: book.into() },
        }
    }
}

/// Sort results for display, most votes first.
pub fn rank_results(results: Vec<ChoiceResult>) -> Vec<ChoiceDescription> {
    let mut choices: Vec<ChoiceDescription> = results.into_iter().map(Into::into).collect();
    choices.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.id.cmp(&b.id)));
    choices
}
