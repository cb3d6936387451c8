use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::choice::ChoiceId;

/// A ballot a user submits for a single poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ballot {
    /// Primary polls: select any number of favourites, each worth one vote.
    Approval { choices: Vec<ChoiceId> },
    /// Secondary polls: rank the submitted choices from 1 (most preferred) to N.
    Ranked { ranks: BTreeMap<ChoiceId, u32> },
}

/// Reasons a ballot cannot be counted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BallotError {
    #[error("Choice {0} appears more than once")]
    DuplicateChoice(ChoiceId),
    #[error("Ranks must be exactly 1 to {expected}, got {got:?}")]
    InvalidRanks { expected: u32, got: Vec<u32> },
    #[error("A {ballot} ballot cannot be cast in a {poll} poll")]
    WrongKind {
        ballot: &'static str,
        poll: &'static str,
    },
}

impl Ballot {
    /// "approval" or "ranked", for messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Approval { .. } => "approval",
            Self::Ranked { .. } => "ranked",
        }
    }

    /// Approval ballots belong to primary polls, ranked ballots to secondary polls.
    pub fn check_kind(&self, primary: bool) -> Result<(), BallotError> {
        match (self, primary) {
            (Self::Approval { .. }, true) | (Self::Ranked { .. }, false) => Ok(()),
            _ => Err(BallotError::WrongKind {
                ballot: self.kind(),
                poll: if primary { "primary" } else { "secondary" },
            }),
        }
    }

    /// The vote weight to add to each choice.
    ///
    /// Approval selections weigh 1 each. Ranks are inverted with
    /// [`rank_weight`] so that rank 1 earns the most votes.
    pub fn weights(&self) -> Result<Vec<(ChoiceId, u32)>, BallotError> {
        match self {
            Self::Approval { choices } => {
                let mut seen = BTreeSet::new();
                for choice in choices {
                    if !seen.insert(*choice) {
                        return Err(BallotError::DuplicateChoice(*choice));
                    }
                }
                Ok(choices.iter().map(|choice| (*choice, 1)).collect())
            }
            Self::Ranked { ranks } => {
                let total = ranks.len() as u32;
                let mut sorted: Vec<u32> = ranks.values().copied().collect();
                sorted.sort_unstable();
                if !sorted.iter().copied().eq(1..=total) {
                    return Err(BallotError::InvalidRanks {
                        expected: total,
                        got: sorted,
                    });
                }
                Ok(ranks
                    .iter()
                    .map(|(choice, rank)| (*choice, rank_weight(*rank, total)))
                    .collect())
            }
        }
    }
}

/// Invert a rank out of `total` ranked choices into a vote weight.
///
/// Assumes `1 <= rank <= total`.
pub fn rank_weight(rank: u32, total: u32) -> u32 {
    total + 1 - rank
}
