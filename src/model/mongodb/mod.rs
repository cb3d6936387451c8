mod collection;
mod counter;
mod errors;

pub use collection::{ensure_indexes_exist, u32_id_filter, Coll, MongoCollection};
pub use counter::{ensure_counters_exist, Counter, BOOK_COUNTER, CHOICE_COUNTER, POLL_COUNTER};
pub use errors::is_duplicate_key_error;
