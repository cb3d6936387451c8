//! The book club's decision engine.
//!
//! [`BookClub`] owns three groups of operations over a [`BookClubStore`]:
//!
//! - the book catalog (`catalog`),
//! - the poll engine, which opens, tallies and completes primary and run-off polls (`polls`),
//! - the vote ledger, which counts ballots once per user (`ledger`).
//!
//! Every operation that writes runs under a single coordinator lock, so the
//! read-then-decide-then-write sequences cannot interleave within a process.
//! The store re-checks poll state inside each write as well.

mod catalog;
mod ledger;
#[cfg(test)]
mod memory;
mod mongo;
mod polls;
mod store;
mod tally;

use log::{error, info};
use mongodb::{Client, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    tokio::sync::Mutex,
    Build, Rocket,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    book::{Book, BookId},
    poll::{Poll, PollId},
};

#[cfg(test)]
pub use memory::{MemoryBookClub, MemoryStore};
pub use mongo::MongoStore;
pub use polls::Completion;
pub use store::BookClubStore;
pub use tally::{TieBreak, VETO_THRESHOLD};

/// The engine as managed by the server.
pub type MongoBookClub = BookClub<MongoStore>;

/// What the club is up to: the book being read, the polls being voted on and
/// the books that could go into the next primary poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub current_book: Option<Book>,
    pub open_polls: Vec<Poll>,
    pub eligible_books: Vec<Book>,
}

/// Catalog, poll engine and vote ledger over a single store.
pub struct BookClub<S> {
    store: S,
    tie_break: TieBreak,
    coordinator: Mutex<()>,
}

impl<S> BookClub<S>
where
    S: BookClubStore,
{
    pub fn new(store: S, tie_break: TieBreak) -> Self {
        Self {
            store,
            tie_break,
            coordinator: Mutex::new(()),
        }
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    pub async fn summary(&self) -> Result<Summary> {
        Ok(Summary {
            current_book: self.current_book().await?,
            open_polls: self.list_polls(Some(false)).await?,
            eligible_books: self.list_eligible_books().await?,
        })
    }

    /// Get a poll or fail with `NotFound`.
    async fn require_poll(&self, id: PollId) -> Result<Poll> {
        self.store
            .poll(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Poll {}", id)))
    }

    /// Get a poll that is still open, failing with `NotFound` or `PollFinished`.
    async fn require_open_poll(&self, id: PollId) -> Result<Poll> {
        let poll = self.require_poll(id).await?;
        if poll.finished {
            return Err(Error::PollFinished(id));
        }
        Ok(poll)
    }

    /// Get a book or fail with `NotFound`.
    async fn require_book(&self, id: BookId) -> Result<Book> {
        self.store
            .book(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Book {}", id)))
    }
}

/// A fairing that builds the book club engine on top of the database and
/// places a [`MongoBookClub`] into managed state.
/// This fairing depends on the config and database being available in managed
/// state, and so must be attached after the fairings responsible for them.
pub struct BookClubFairing;

#[rocket::async_trait]
impl Fairing for BookClubFairing {
    fn info(&self) -> Info {
        Info {
            name: "Book Club",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let (client, db, config) = match (
            rocket.state::<Client>(),
            rocket.state::<Database>(),
            rocket.state::<Config>(),
        ) {
            (Some(client), Some(db), Some(config)) => (client, db, config),
            _ => {
                error!("Config and database must be available before the book club");
                return Err(rocket);
            }
        };

        let store = MongoStore::new(client.clone(), db);
        let engine = BookClub::new(store, config.tie_break());
        info!("Book club engine ready");

        Ok(rocket.manage(engine))
    }
}
