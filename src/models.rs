//! Domain models for the catalog. These types stay light-weight data holders
//! so the catalog, the store and the UI can all pass them around freely. The
//! store mirrors `Book` column for column, and the JSON transfer format is
//! the serde representation of the same struct.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Identifier handed out by the catalog. Kept as `i64` so it maps directly to
/// an SQLite `INTEGER PRIMARY KEY`.
pub type BookId = i64;

/// Lowest publication year accepted when a book is created.
pub const MIN_YEAR: i64 = 1000;
/// Inclusive bounds for a single rating.
pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One catalog entry.
pub struct Book {
    /// Sequential id assigned at creation. Never reused after a deletion.
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub genre: String,
    /// Publication year, validated against `[MIN_YEAR, current year]` when the
    /// book was added.
    pub year: i64,
    pub price: f64,
    /// `false` while the book is lent out.
    pub available: bool,
    /// Append-only history of 1-5 scores.
    #[serde(default)]
    pub ratings: Vec<u8>,
}

impl Book {
    /// Arithmetic mean of the recorded ratings, or `None` when the book has
    /// never been rated.
    pub fn average_rating(&self) -> Option<f64> {
        if self.ratings.is_empty() {
            return None;
        }
        let sum: u32 = self.ratings.iter().map(|&r| u32::from(r)).sum();
        Some(f64::from(sum) / self.ratings.len() as f64)
    }

    /// Field lookup used by search. Genre is included even though sorting by
    /// it is not offered.
    pub(crate) fn field(&self, field: SearchField) -> &str {
        match field {
            SearchField::Title => &self.title,
            SearchField::Author => &self.author,
            SearchField::Genre => &self.genre,
        }
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' (ID {})", self.title, self.id)
    }
}

/// Raw input for a new book, exactly as typed by the user. Validation and
/// parsing happen inside `Catalog::add_book` so every caller (TUI form, CLI
/// flags, tests) goes through the same rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub year: String,
    pub price: String,
}

impl BookDraft {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        genre: impl Into<String>,
        year: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            genre: genre.into(),
            year: year.into(),
            price: price.into(),
        }
    }

    /// Names of the fields left blank, in form order.
    pub(crate) fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("title", &self.title),
            ("author", &self.author),
            ("genre", &self.genre),
            ("publication year", &self.year),
            ("price", &self.price),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Result of an operation gated by a confirmation step. Declining is a normal
/// outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

impl Outcome {
    pub fn from_confirmation(confirmed: bool) -> Self {
        if confirmed {
            Outcome::Completed
        } else {
            Outcome::Cancelled
        }
    }
}

/// What a return did. Once confirmed the book is always back on the shelf; a
/// rejected score is dropped without undoing the return.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnOutcome {
    Cancelled,
    Returned { rating: Option<u8> },
    RatingDiscarded(CatalogError),
}

impl ReturnOutcome {
    pub fn outcome(&self) -> Outcome {
        match self {
            ReturnOutcome::Cancelled => Outcome::Cancelled,
            ReturnOutcome::Returned { .. } | ReturnOutcome::RatingDiscarded(_) => {
                Outcome::Completed
            }
        }
    }
}

/// Columns the list view can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Id,
    Title,
    Author,
    Price,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [SortKey::Id, SortKey::Title, SortKey::Author, SortKey::Price];

    /// Case-insensitive lookup by column name. Unknown names fall back to
    /// `Id`; callers that want to reject them should compare the input against
    /// `SortKey::label` themselves.
    pub fn parse_or_default(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "title" => SortKey::Title,
            "author" => SortKey::Author,
            "price" => SortKey::Price,
            _ => SortKey::Id,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Id => "ID",
            SortKey::Title => "title",
            SortKey::Author => "author",
            SortKey::Price => "price",
        }
    }

    /// Next key in display order, wrapping around. Drives the `o` shortcut.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&k| k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// Text fields a search can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchField {
    #[default]
    Title,
    Author,
    Genre,
}

impl SearchField {
    pub const ALL: [SearchField; 3] = [SearchField::Title, SearchField::Author, SearchField::Genre];

    pub fn label(self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Author => "author",
            SearchField::Genre => "genre",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SearchField::Title => SearchField::Author,
            SearchField::Author => SearchField::Genre,
            SearchField::Genre => SearchField::Title,
        }
    }
}

impl FromStr for SearchField {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "title" => Ok(SearchField::Title),
            "author" => Ok(SearchField::Author),
            "genre" => Ok(SearchField::Genre),
            _ => Err(CatalogError::InvalidCriterion(s.trim().to_string())),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
