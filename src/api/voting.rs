use log::debug;
use rocket::{serde::json::Json, Route, State};

use crate::{
    bookclub::MongoBookClub,
    error::Result,
    logging::RequestId,
    model::{
        auth::{AuthToken, Member},
        ballot::Ballot,
        poll::PollId,
    },
};

pub fn routes() -> Vec<Route> {
    routes![submit_ballot, has_voted]
}

/// Submit the caller's ballot. Each member votes at most once per poll.
#[post("/polls/<poll_id>/ballot", data = "<ballot>", format = "json")]
async fn submit_ballot(
    token: AuthToken<Member>,
    poll_id: PollId,
    ballot: Json<Ballot>,
    club: &State<MongoBookClub>,
    request_id: &RequestId,
) -> Result<()> {
    debug!(
        "req{request_id} {} ballot from '{}' for poll {poll_id}",
        ballot.kind(),
        token.username()
    );
    club.submit_ballot(poll_id, token.username(), &ballot)
        .await
}

#[get("/polls/<poll_id>/voted")]
async fn has_voted(
    token: AuthToken<Member>,
    poll_id: PollId,
    club: &State<MongoBookClub>,
) -> Result<Json<bool>> {
    Ok(Json(club.has_voted(poll_id, token.username()).await?))
}
