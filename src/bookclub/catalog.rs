use log::{error, info};
use rocket::http::Status;

use crate::error::{Error, Result};
use crate::model::book::{Book, BookCore, BookFilter, BookId, BookSpec};

use super::{BookClub, BookClubStore};

impl<S> BookClub<S>
where
    S: BookClubStore,
{
    /// Add a book to the catalog, eligible for the next primary poll.
    ///
    /// Titles are not checked for uniqueness here.
    pub async fn add_book(&self, spec: BookSpec) -> Result<Book> {
        spec.validate().map_err(Error::bad_request)?;

        let _guard = self.coordinator.lock().await;
        self.insert_book(spec).await
    }

    /// Add a book to the catalog unless its title is already taken.
    pub async fn add_new_book(&self, spec: BookSpec) -> Result<Book> {
        spec.validate().map_err(Error::bad_request)?;

        let _guard = self.coordinator.lock().await;
        if let Some(existing) = self.store.book_by_title(&spec.title).await? {
            return Err(Error::Status(
                Status::Conflict,
                format!("Book title already in use: {} ({})", spec.title, existing.id),
            ));
        }
        self.insert_book(spec).await
    }

    async fn insert_book(&self, spec: BookSpec) -> Result<Book> {
        let book = self.store.insert_book(BookCore::new(spec)).await?;
        info!("Added book {} '{}'", book.id, book.spec.title);
        Ok(book)
    }

    /// Look a book up by ID, or failing that by exact title.
    pub async fn get_book(&self, id: Option<BookId>, title: Option<&str>) -> Result<Book> {
        match (id, title) {
            (Some(id), _) => self.require_book(id).await,
            (None, Some(title)) => self
                .store
                .book_by_title(title)
                .await?
                .ok_or_else(|| Error::not_found(format!("Book '{title}'"))),
            (None, None) => Err(Error::bad_request("Give a book ID or title")),
        }
    }

    pub async fn list_books(&self) -> Result<Vec<Book>> {
        self.store.books(BookFilter::All).await
    }

    /// Books that can be candidates in a new primary poll.
    pub async fn list_eligible_books(&self) -> Result<Vec<Book>> {
        self.store.books(BookFilter::Eligible).await
    }

    /// The book being read, if any.
    pub async fn current_book(&self) -> Result<Option<Book>> {
        let mut current = self.store.books(BookFilter::Current).await?;
        if current.len() > 1 {
            error!("{} books are marked current", current.len());
            return Err(Error::Status(
                Status::InternalServerError,
                "More than one current book".to_string(),
            ));
        }
        Ok(current.pop())
    }

    /// Remove a book from the catalog along with its choices in finished polls.
    pub async fn remove_book(&self, id: BookId) -> Result<()> {
        let _guard = self.coordinator.lock().await;

        if self.store.book_in_open_poll(id).await? {
            return Err(Error::BookInUse(id));
        }
        if !self.store.delete_book(id).await? {
            return Err(Error::not_found(format!("Book {id}")));
        }
        info!("Removed book {id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::bookclub::{MemoryBookClub, TieBreak};
    use crate::model::period::Period;

    use super::*;

    #[rocket::async_test]
    async fn added_books_start_eligible() {
        let club = MemoryBookClub::in_memory(TieBreak::default());

        let book = club
            .add_book(BookSpec::example("The Left Hand of Darkness"))
            .await
            .unwrap();
        assert_eq!(book.id, 1);
        assert!(!book.read && !book.veto && !book.current);
        assert_eq!(club.list_eligible_books().await.unwrap(), vec![book.clone()]);
        assert_eq!(club.list_books().await.unwrap(), vec![book]);
        assert!(club.current_book().await.unwrap().is_none());
    }

    #[rocket::async_test]
    async fn new_books_need_a_free_title() {
        let club = MemoryBookClub::in_memory(TieBreak::default());
        let first = club
            .add_new_book(BookSpec::example("Always Coming Home"))
            .await
            .unwrap();

        // Concurrent additions of one title let exactly one through.
        let (a, b) = rocket::tokio::join!(
            club.add_new_book(BookSpec::example("Lavinia")),
            club.add_new_book(BookSpec::example("Lavinia")),
        );
        assert!(a.is_ok() != b.is_ok());
        assert!(matches!(
            a.and(b),
            Err(Error::Status(status, _)) if status == Status::Conflict
        ));

        assert!(matches!(
            club.add_new_book(BookSpec::example("Always Coming Home")).await,
            Err(Error::Status(status, _)) if status == Status::Conflict
        ));
        let titles: Vec<_> = club
            .list_books()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.spec.title.clone())
            .collect();
        assert_eq!(titles, vec!["Always Coming Home", "Lavinia"]);
        assert_eq!(club.get_book(Some(first.id), None).await.unwrap(), first);
    }

    #[rocket::async_test]
    async fn invalid_book_is_rejected() {
        let club = MemoryBookClub::in_memory(TieBreak::default());

        let mut spec = BookSpec::example("Nameless");
        spec.title = " ".to_string();
        assert!(matches!(
            club.add_book(spec).await,
            Err(Error::Status(status, _)) if status == Status::BadRequest
        ));
        assert!(club.list_books().await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn lookup_by_id_or_title() {
        let (club, books) = MemoryBookClub::with_books(&["Tehanu", "Tombs of Atuan"]).await;

        let by_title = club.get_book(None, Some("Tombs of Atuan")).await.unwrap();
        assert_eq!(by_title.id, books[1].id);

        // The ID wins when both are given.
        let both = club
            .get_book(Some(books[0].id), Some("Tombs of Atuan"))
            .await
            .unwrap();
        assert_eq!(both.id, books[0].id);

        assert!(matches!(
            club.get_book(Some(99), None).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            club.get_book(None, Some("Earthsea")).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            club.get_book(None, None).await,
            Err(Error::Status(status, _)) if status == Status::BadRequest
        ));
    }

    #[rocket::async_test]
    async fn remove_book_guards_open_polls() {
        let (club, books) = MemoryBookClub::with_books(&["X", "Y"]).await;

        let poll = club.open_primary_poll(Period::example()).await.unwrap();
        assert!(matches!(
            club.remove_book(books[0].id).await,
            Err(Error::BookInUse(id)) if id == books[0].id
        ));

        // Once the poll is over, removal cascades to its choices.
        let results = club.poll_results(poll.id).await.unwrap();
        club.cast_vote(poll.id, results[1].choice.id, 2)
            .await
            .unwrap();
        club.complete_primary_poll(poll.id).await.unwrap();
        club.remove_book(books[0].id).await.unwrap();

        let remaining = club.poll_results(poll.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].book.id, books[1].id);
        assert!(matches!(
            club.remove_book(books[0].id).await,
            Err(Error::NotFound(_))
        ));
    }
}
