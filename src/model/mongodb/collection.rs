use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::{doc, Document},
    error::Error as DbError,
    options::IndexOptions,
    Collection, Database, IndexModel,
};

use crate::model::{book::Book, choice::Choice, poll::Poll};

use super::counter::Counter;

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl MongoCollection for Book {
    const NAME: &'static str = "books";
}

impl MongoCollection for Poll {
    const NAME: &'static str = "polls";
}

impl MongoCollection for Choice {
    const NAME: &'static str = "choices";
}

impl MongoCollection for Counter {
    const NAME: &'static str = "counters";
}

/// Filter matching the document with the given integer ID.
pub fn u32_id_filter(id: u32) -> Document {
    doc! {
        "_id": id,
    }
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    // At most one open primary poll per period.
    let open_primary = IndexOptions::builder()
        .unique(true)
        .partial_filter_expression(doc! {"primary": true, "finished": false})
        .build();
    let poll_index = IndexModel::builder()
        .keys(doc! {"date": 1})
        .options(open_primary)
        .build();
    Coll::<Poll>::from_db(db)
        .create_index(poll_index, None)
        .await?;

    // A book is a candidate at most once per poll.
    let unique = IndexOptions::builder().unique(true).build();
    let choice_index = IndexModel::builder()
        .keys(doc! {"poll_id": 1, "book_id": 1})
        .options(unique)
        .build();
    Coll::<Choice>::from_db(db)
        .create_index(choice_index, None)
        .await?;

    // Catalog removal looks choices up by book.
    let book_lookup = IndexModel::builder().keys(doc! {"book_id": 1}).build();
    Coll::<Choice>::from_db(db)
        .create_index(book_lookup, None)
        .await?;

    Ok(())
}
