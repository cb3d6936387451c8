use serde::{Deserialize, Serialize};

use crate::model::period::Period;

/// Our poll IDs are integers.
pub type PollId = u32;

/// A primary or secondary poll, as stored in the database.
///
/// A poll is created open and becomes finished exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    #[serde(rename = "_id")]
    pub id: PollId,
    /// The period this poll picks a book for.
    pub date: Period,
    /// Primary polls run over the whole eligible catalog; secondary polls are run-offs.
    pub primary: bool,
    pub finished: bool,
    /// Users who have submitted a ballot, each at most once.
    #[serde(default)]
    pub voters: Vec<String>,
}

impl Poll {
    /// A new, open poll with no voters.
    pub fn new(id: PollId, date: Period, primary: bool) -> Self {
        Self {
            id,
            date,
            primary,
            finished: false,
            voters: Vec::new(),
        }
    }

    /// Has the given user already voted in this poll?
    pub fn has_voter(&self, user: &str) -> bool {
        self.voters.iter().any(|voter| voter == user)
    }

    /// "primary" or "secondary", for messages.
    pub fn kind(&self) -> &'static str {
        if self.primary {
            "primary"
        } else {
            "secondary"
        }
    }
}
