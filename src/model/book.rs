use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

/// Our book IDs are integers.
pub type BookId = u32;

/// Descriptive book data, as submitted when adding a book to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSpec {
    pub title: String,
    pub author: String,
    pub page_count: u32,
    pub description: String,
    /// Path or URL of the cover image.
    pub image: String,
}

impl BookSpec {
    /// Check the fields are acceptable, returning a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Book title must not be empty".to_string());
        }
        if self.author.trim().is_empty() {
            return Err(format!("Book '{}' has no author", self.title));
        }
        Ok(())
    }
}

/// Core book data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookCore {
    #[serde(flatten)]
    pub spec: BookSpec,
    /// Already read by the club.
    pub read: bool,
    /// Permanently excluded from primary polls.
    pub veto: bool,
    /// Currently being read. At most one book has this set.
    pub current: bool,
}

impl BookCore {
    /// A fresh catalog entry with no status flags set.
    pub fn new(spec: BookSpec) -> Self {
        Self {
            spec,
            read: false,
            veto: false,
            current: false,
        }
    }

    /// Can this book be a candidate in a new poll?
    pub fn is_eligible(&self) -> bool {
        !(self.read || self.veto || self.current)
    }
}

/// A book from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: BookId,
    #[serde(flatten)]
    pub book: BookCore,
}

impl Deref for Book {
    type Target = BookCore;

    fn deref(&self) -> &Self::Target {
        &self.book
    }
}

impl DerefMut for Book {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.book
    }
}

/// Which books to fetch from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookFilter {
    All,
    /// Not read, not vetoed, not current.
    Eligible,
    Current,
}

impl BookFilter {
    pub fn matches(&self, book: &BookCore) -> bool {
        match self {
            Self::All => true,
            Self::Eligible => book.is_eligible(),
            Self::Current => book.current,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl BookSpec {
        pub fn example(title: &str) -> Self {
            Self {
                title: title.to_string(),
                author: "Ursula K. Le Guin".to_string(),
                page_count: 248,
                description: "An anarchist physicist crosses to the propertarian twin world."
                    .to_string(),
                image: format!("/covers/{}.jpg", title.to_lowercase().replace(' ', "-")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eligibility() {
        let mut book = BookCore::new(BookSpec::example("The Dispossessed"));
        assert!(book.is_eligible());
        assert!(BookFilter::Eligible.matches(&book));
        assert!(!BookFilter::Current.matches(&book));

        book.veto = true;
        assert!(!book.is_eligible());
        book.veto = false;
        book.read = true;
        assert!(!book.is_eligible());
        book.read = false;
        book.current = true;
        assert!(!book.is_eligible());
        assert!(BookFilter::Current.matches(&book));
        assert!(BookFilter::All.matches(&book));
    }

    #[test]
    fn validation() {
        assert!(BookSpec::example("Lathe of Heaven").validate().is_ok());

        let mut spec = BookSpec::example("  ");
        assert!(spec.validate().is_err());
        spec.title = "Always Coming Home".to_string();
        spec.author = String::new();
        assert!(spec.validate().is_err());
    }
}
