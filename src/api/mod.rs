use rocket::{serde::json::Json, Route, State};

use crate::{
    bookclub::MongoBookClub,
    error::Result,
    model::{
        api::summary::BookClubSummary,
        auth::{AuthToken, Member},
    },
};

mod books;
mod polls;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = routes![get_summary];
    routes.extend(books::routes());
    routes.extend(polls::routes());
    routes.extend(voting::routes());
    routes
}

#[get("/")]
async fn get_summary(
    _token: AuthToken<Member>,
    club: &State<MongoBookClub>,
) -> Result<Json<BookClubSummary>> {
    Ok(Json(club.summary().await?.into()))
}


#[cfg(all(test, feature = "db-tests"))]
mod tests {
    use rocket::{http::Status, local::asynchronous::Client};

    use super::{test_helpers::*, *};

    #[backend_test]
    async fn summary_needs_membership(client: Client) {
        let response = client.get(uri!("/bookclub", get_summary)).dispatch().await;
        assert_eq!(response.status(), Status::Unauthorized);

        let response = client
            .get(uri!("/bookclub", get_summary))
            .cookie(member(&client, "genly"))
            .dispatch()
            .await;
        let summary: BookClubSummary = json(response, Status::Ok).await;
        assert!(summary.current_book.is_none());
        assert!(summary.open_polls.is_empty());
    }
}
