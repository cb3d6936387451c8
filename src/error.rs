use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::{debug, error};
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::{self, status::Custom, Responder},
    Request,
};
use thiserror::Error;

use crate::model::{
    ballot::BallotError,
    book::BookId,
    period::{Period, PeriodError},
    poll::PollId,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("A primary poll for {0} is already open")]
    DuplicatePoll(Period),
    #[error("User '{user}' has already voted in poll {poll}")]
    AlreadyVoted { poll: PollId, user: String },
    #[error("Poll {0} is already finished")]
    PollFinished(PollId),
    #[error("Poll {poll} has {tied} choices tied at {votes} votes")]
    AmbiguousWinner {
        poll: PollId,
        tied: usize,
        votes: u32,
    },
    #[error("Poll {0} has no candidates")]
    NoCandidates(PollId),
    #[error("Book {0} is a candidate in an open poll")]
    BookInUse(BookId),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, msg.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::NotFound(_) => Status::NotFound,
            Self::DuplicatePoll(_)
            | Self::AlreadyVoted { .. }
            | Self::PollFinished(_)
            | Self::BookInUse(_) => Status::Conflict,
            Self::AmbiguousWinner { .. } | Self::NoCandidates(_) => Status::UnprocessableEntity,
            Self::Status(status, _) => *status,
        }
    }
}

impl From<BallotError> for Error {
    fn from(err: BallotError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<PeriodError> for Error {
    fn from(err: PeriodError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        if status.class() == StatusClass::ServerError {
            error!("{} {}: {self}", req.method(), req.uri());
        } else {
            debug!("{} {}: {self}", req.method(), req.uri());
        }
        Custom(status, self.to_string()).respond_to(req)
    }
}
