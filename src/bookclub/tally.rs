//! Pure vote-counting decisions. Nothing here touches the store.

use log::warn;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{
    book::{Book, BookId},
    choice::Choice,
    poll::PollId,
};

/// Books with at most this many votes in a primary poll are vetoed.
pub const VETO_THRESHOLD: u32 = 1;

/// How to settle a run-off poll whose lead is shared by several books.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Pick the tied book with the lowest ID.
    #[default]
    LowestBookId,
    /// Refuse to complete the poll; an administrator must intervene.
    Reject,
}

/// Highest vote count among the choices, or zero if there are none.
pub fn max_votes(choices: &[Choice]) -> u32 {
    choices.iter().map(|c| c.votes).max().unwrap_or(0)
}

/// Books that drew too little interest in a primary poll, in ID order.
pub fn vetoed_books(choices: &[Choice]) -> Vec<BookId> {
    sorted_books(choices.iter().filter(|c| c.votes <= VETO_THRESHOLD))
}

/// Books whose choices share the maximum vote count, in ID order.
pub fn leading_books(choices: &[Choice]) -> Vec<BookId> {
    let max = max_votes(choices);
    sorted_books(choices.iter().filter(|c| c.votes == max))
}

/// The candidates for the run-off that follows a primary poll.
///
/// `leaders` are the leading books as they are in the catalog now. A leader
/// only goes through if it is still eligible once `vetoes` are applied, which
/// can exclude every leader when the lead is itself within the veto threshold.
pub fn runoff_candidates(leaders: &[Book], vetoes: &[BookId]) -> Vec<BookId> {
    let mut candidates: Vec<BookId> = leaders
        .iter()
        .filter(|book| book.is_eligible() && !vetoes.contains(&book.id))
        .map(|book| book.id)
        .collect();
    candidates.sort_unstable();
    candidates.dedup();
    candidates
}

impl TieBreak {
    /// Pick the winning book of a run-off poll.
    pub fn winner(self, poll: PollId, choices: &[Choice]) -> Result<BookId> {
        let leaders = leading_books(choices);
        match leaders.as_slice() {
            [] => Err(Error::NoCandidates(poll)),
            [winner] => Ok(*winner),
            [lowest, ..] => match self {
                Self::LowestBookId => {
                    warn!(
                        "Poll {poll}: {} books tied at {} votes, picking lowest ID {lowest}",
                        leaders.len(),
                        max_votes(choices)
                    );
                    Ok(*lowest)
                }
                Self::Reject => Err(Error::AmbiguousWinner {
                    poll,
                    tied: leaders.len(),
                    votes: max_votes(choices),
                }),
            },
        }
    }
}

fn sorted_books<'a>(choices: impl Iterator<Item = &'a Choice>) -> Vec<BookId> {
    let mut books: Vec<BookId> = choices.map(|c| c.book_id).collect();
    books.sort_unstable();
    books.dedup();
    books
}
