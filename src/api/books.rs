use rocket::{serde::json::Json, Route, State};

use crate::{
    bookclub::MongoBookClub,
    error::Result,
    model::{
        api::book::{BookDescription, BookQuery},
        auth::{Admin, AuthToken, Member},
        book::{Book, BookId, BookSpec},
    },
};

pub fn routes() -> Vec<Route> {
    routes![
        get_books,
        get_eligible_books,
        get_current_book,
        lookup_book,
        get_book,
        add_book,
        remove_book,
    ]
}

fn describe(books: Vec<Book>) -> Json<Vec<BookDescription>> {
    Json(books.into_iter().map(Into::into).collect())
}

#[get("/books")]
async fn get_books(
    _token: AuthToken<Member>,
    club: &State<MongoBookClub>,
) -> Result<Json<Vec<BookDescription>>> {
    Ok(describe(club.list_books().await?))
}

#[get("/books/eligible")]
async fn get_eligible_books(
    _token: AuthToken<Member>,
    club: &State<MongoBookClub>,
) -> Result<Json<Vec<BookDescription>>> {
    Ok(describe(club.list_eligible_books().await?))
}

#[get("/books/current")]
async fn get_current_book(
    _token: AuthToken<Member>,
    club: &State<MongoBookClub>,
) -> Result<Json<Option<BookDescription>>> {
    Ok(Json(club.current_book().await?.map(Into::into)))
}

#[get("/books/lookup?<query..>")]
async fn lookup_book(
    _token: AuthToken<Member>,
    query: BookQuery,
    club: &State<MongoBookClub>,
) -> Result<Json<BookDescription>> {
    let book = club.get_book(query.id, query.title.as_deref()).await?;
    Ok(Json(book.into()))
}

#[get("/books/<book_id>")]
async fn get_book(
    _token: AuthToken<Member>,
    book_id: BookId,
    club: &State<MongoBookClub>,
) -> Result<Json<BookDescription>> {
    Ok(Json(club.get_book(Some(book_id), None).await?.into()))
}

#[post("/books", data = "<spec>", format = "json")]
async fn add_book(
    _token: AuthToken<Member>,
    spec: Json<BookSpec>,
    club: &State<MongoBookClub>,
) -> Result<Json<BookDescription>> {
    let book = club.add_new_book(spec.0).await?;
    Ok(Json(book.into()))
}

#[delete("/books/<book_id>")]
async fn remove_book(
    _token: AuthToken<Admin>,
    book_id: BookId,
    club: &State<MongoBookClub>,
) -> Result<()> {
    club.remove_book(book_id).await
}

#[cfg(all(test, feature = "db-tests"))]
mod tests {
    use rocket::{http::Status, local::asynchronous::Client};

    use crate::api::test_helpers::*;

    use super::*;

    async fn add(client: &Client, title: &str) -> BookDescription {
        let response = client
            .post(uri!("/bookclub", add_book))
            .cookie(member(client, "genly"))
            .json(&BookSpec::example(title))
            .dispatch()
            .await;
        json(response, Status::Ok).await
    }

    #[backend_test]
    async fn add_and_fetch_books(client: Client) {
        let first = add(&client, "The Word for World Is Forest").await;
        let second = add(&client, "Rocannon's World").await;
        assert_eq!(first.title, "The Word for World Is Forest");
        assert!(!first.read && !first.veto && !first.current);

        let response = client
            .get(uri!("/bookclub", get_books))
            .cookie(member(&client, "genly"))
            .dispatch()
            .await;
        let books: Vec<BookDescription> = json(response, Status::Ok).await;
        assert_eq!(books, vec![first.clone(), second.clone()]);

        let response = client
            .get(uri!("/bookclub", get_book(second.id)))
            .cookie(member(&client, "genly"))
            .dispatch()
            .await;
        assert_eq!(json::<BookDescription>(response, Status::Ok).await, second);

        let response = client
            .get("/bookclub/books/lookup?title=The%20Word%20for%20World%20Is%20Forest")
            .cookie(member(&client, "genly"))
            .dispatch()
            .await;
        assert_eq!(json::<BookDescription>(response, Status::Ok).await, first);

        let response = client
            .get(uri!("/bookclub", get_current_book))
            .cookie(member(&client, "genly"))
            .dispatch()
            .await;
        assert_eq!(json::<Option<BookDescription>>(response, Status::Ok).await, None);
    }

    #[backend_test]
    async fn bad_books(client: Client) {
        add(&client, "Planet of Exile").await;

        // Duplicate title.
        let response = client
            .post(uri!("/bookclub", add_book))
            .cookie(member(&client, "genly"))
            .json(&BookSpec::example("Planet of Exile"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Conflict);

        // Empty title.
        let response = client
            .post(uri!("/bookclub", add_book))
            .cookie(member(&client, "genly"))
            .json(&BookSpec::example(""))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        // Unknown book.
        let response = client
            .get(uri!("/bookclub", get_book(404)))
            .cookie(member(&client, "genly"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[backend_test]
    async fn only_admins_remove_books(client: Client) {
        let book = add(&client, "City of Illusions").await;

        let response = client
            .delete(uri!("/bookclub", remove_book(book.id)))
            .cookie(member(&client, "genly"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);

        let response = client
            .delete(uri!("/bookclub", remove_book(book.id)))
            .cookie(admin(&client))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = client
            .delete(uri!("/bookclub", remove_book(book.id)))
            .cookie(admin(&client))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }
}
