use mongodb::{
    bson::doc,
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
    ClientSession,
};
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Coll;

/// Counter backing book IDs.
pub const BOOK_COUNTER: &str = "books";
/// Counter backing poll IDs.
pub const POLL_COUNTER: &str = "polls";
/// Counter backing choice IDs.
pub const CHOICE_COUNTER: &str = "choices";

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    /// Name of the sequence this counter backs.
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u32,
}

impl Counter {
    /// Create a new `Counter` starting at the given value.
    pub fn new(id: impl Into<String>, start: u32) -> Self {
        Self {
            id: id.into(),
            next: start,
        }
    }

    /// Atomically retrieve the next value of the named counter.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> Result<u32> {
        let counter = counters
            .find_one_and_update(doc! {"_id": id}, Self::increment(), Self::options())
            .await?;
        Self::value_of(counter, id)
    }

    /// Atomically retrieve the next value of the named counter, as part of a transaction.
    pub async fn next_with_session(
        counters: &Coll<Counter>,
        id: &str,
        session: &mut ClientSession,
    ) -> Result<u32> {
        let counter = counters
            .find_one_and_update_with_session(
                doc! {"_id": id},
                Self::increment(),
                Self::options(),
                session,
            )
            .await?;
        Self::value_of(counter, id)
    }

    fn increment() -> mongodb::bson::Document {
        doc! {
            "$inc": { "next": 1 }
        }
    }

    fn options() -> FindOneAndUpdateOptions {
        FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build()
    }

    fn value_of(counter: Option<Counter>, id: &str) -> Result<u32> {
        counter.map(|counter| counter.next).ok_or_else(|| {
            Error::Status(
                Status::InternalServerError,
                format!("Failed to find counter with ID {}", id),
            )
        })
    }
}

/// Ensure every ID counter exists, starting new ones at 1.
///
/// This operation is idempotent: existing counters are left untouched.
pub async fn ensure_counters_exist(counters: &Coll<Counter>) -> std::result::Result<(), DbError> {
    let upsert = UpdateOptions::builder().upsert(true).build();
    for id in [BOOK_COUNTER, POLL_COUNTER, CHOICE_COUNTER] {
        let update = doc! {
            "$setOnInsert": { "next": 1 }
        };
        counters
            .update_one(doc! {"_id": id}, update, upsert.clone())
            .await?;
    }
    Ok(())
}

#[cfg(all(test, feature = "db-tests"))]
mod tests {
    use super::*;

    use mongodb::Database;

    #[backend_test]
    async fn counter_increment(db: Database) {
        const START: u32 = 5;

        // Create a counter and insert it.
        let counters = Coll::<Counter>::from_db(&db);
        counters
            .insert_one(Counter::new("test", START), None)
            .await
            .unwrap();

        // Get the next value.
        let next = Counter::next(&counters, "test").await.unwrap();
        assert_eq!(next, START);

        // Check the counter was incremented.
        let counter = counters
            .find_one(doc! {"_id": "test"}, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(counter.next, START + 1);

        // Ensuring the standard counters does not disturb existing ones.
        ensure_counters_exist(&counters).await.unwrap();
        let book_id = Counter::next(&counters, BOOK_COUNTER).await.unwrap();
        assert!(book_id >= 1);
        ensure_counters_exist(&counters).await.unwrap();
        let again = Counter::next(&counters, BOOK_COUNTER).await.unwrap();
        assert_eq!(again, book_id + 1);
    }
}
