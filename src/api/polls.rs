use rocket::{serde::json::Json, Route, State};

use crate::{
    bookclub::MongoBookClub,
    error::Result,
    model::{
        api::poll::{
            rank_results, ChoiceDescription, CompletionDescription, PollDescription, PollRequest,
            PollSummary,
        },
        auth::{Admin, AuthToken, Member},
        poll::PollId,
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        get_polls,
        open_poll,
        get_poll,
        edit_poll,
        delete_poll,
        complete_poll,
        get_results,
    ]
}

#[get("/polls?<finished>")]
async fn get_polls(
    _token: AuthToken<Member>,
    finished: Option<bool>,
    club: &State<MongoBookClub>,
) -> Result<Json<Vec<PollSummary>>> {
    let polls = club.list_polls(finished).await?;
    Ok(Json(polls.into_iter().map(Into::into).collect()))
}

#[post("/polls", data = "<request>", format = "json")]
async fn open_poll(
    _token: AuthToken<Admin>,
    request: Json<PollRequest>,
    club: &State<MongoBookClub>,
) -> Result<Json<PollSummary>> {
    let poll = club.open_primary_poll(request.period).await?;
    Ok(Json(poll.into()))
}

#[get("/polls/<poll_id>")]
async fn get_poll(
    token: AuthToken<Member>,
    poll_id: PollId,
    club: &State<MongoBookClub>,
) -> Result<Json<PollDescription>> {
    let poll = club.get_poll(poll_id).await?;
    let results = club.poll_results(poll_id).await?;
    let has_voted = poll.has_voter(token.username());
    Ok(Json(PollDescription {
        poll: poll.into(),
        choices: results.into_iter().map(Into::into).collect(),
        has_voted,
    }))
}

#[put("/polls/<poll_id>", data = "<request>", format = "json")]
async fn edit_poll(
    _token: AuthToken<Admin>,
    poll_id: PollId,
    request: Json<PollRequest>,
    club: &State<MongoBookClub>,
) -> Result<Json<PollSummary>> {
    let poll = club.edit_poll_period(poll_id, request.period).await?;
    Ok(Json(poll.into()))
}

#[delete("/polls/<poll_id>")]
async fn delete_poll(
    _token: AuthToken<Admin>,
    poll_id: PollId,
    club: &State<MongoBookClub>,
) -> Result<()> {
    club.delete_poll(poll_id).await
}

#[post("/polls/<poll_id>/complete")]
async fn complete_poll(
    _token: AuthToken<Admin>,
    poll_id: PollId,
    club: &State<MongoBookClub>,
) -> Result<Json<CompletionDescription>> {
    let completion = club.complete_poll(poll_id).await?;
    Ok(Json(completion.into()))
}

/// Results of a poll, most votes first.
#[get("/polls/<poll_id>/results")]
async fn get_results(
    _token: AuthToken<Member>,
    poll_id: PollId,
    club: &State<MongoBookClub>,
) -> Result<Json<Vec<ChoiceDescription>>> {
    Ok(Json(rank_results(club.poll_results(poll_id).await?)))
}
