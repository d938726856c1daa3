use thiserror::Error;

use crate::models::BookId;

/// Failures raised by catalog operations. Every variant is detected before the
/// catalog is touched, so an error never leaves a half-applied change behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("The following fields are missing: {}", .0.join(", "))]
    MissingField(Vec<&'static str>),
    #[error("Publication year must be a whole number between 1000 and {max} (got '{value}').")]
    InvalidYear { value: String, max: i64 },
    #[error("Price must be a non-negative number (got '{0}').")]
    InvalidPrice(String),
    #[error("Rating must be between 1 and 5 (got {0}).")]
    InvalidRating(i64),
    #[error("Invalid search criterion '{0}'. Use 'title', 'author' or 'genre'.")]
    InvalidCriterion(String),
    #[error("Book ID {0} is out of range.")]
    IdOutOfRange(BookId),
    #[error("Book with ID {0} not found.")]
    NotFound(BookId),
    #[error("'{title}' (ID {id}) is not available for borrowing.")]
    NotAvailable { id: BookId, title: String },
    #[error("'{title}' (ID {id}) was not borrowed.")]
    NotBorrowed { id: BookId, title: String },
}
