//! The catalog: an ordered list of books plus every operation that reads or
//! mutates it. Nothing in here performs I/O. Confirmation prompts live with
//! the caller, which resolves them first and hands the decision in as a
//! boolean, so each mutation can run unattended in tests.

use chrono::Datelike;

use crate::error::CatalogError;
use crate::models::{
    Book, BookDraft, BookId, Outcome, ReturnOutcome, SearchField, SortKey, MAX_RATING, MIN_RATING,
    MIN_YEAR,
};

/// Ordered collection of books. Insertion order is the default display order.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    books: Vec<Book>,
    next_id: BookId,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Current calendar year from the local clock.
pub fn current_year() -> i64 {
    i64::from(chrono::Local::now().year())
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            books: Vec::new(),
            next_id: 1,
        }
    }

    /// Rebuild a catalog from persisted records. `next_id` is bumped past the
    /// highest stored id so a stale counter can never hand out a duplicate.
    /// Fails when that highest id leaves no room for a successor.
    pub fn from_parts(books: Vec<Book>, next_id: BookId) -> Result<Self, CatalogError> {
        let highest = books.iter().map(|b| b.id).max().unwrap_or(0);
        let floor = highest
            .checked_add(1)
            .ok_or(CatalogError::IdOutOfRange(highest))?;
        Ok(Self {
            books,
            next_id: next_id.max(floor).max(1),
        })
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn iter(&self) -> impl Iterator<Item = &Book> + '_ {
        self.books.iter()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Id the next successful `add_book` will assign.
    pub fn next_id(&self) -> BookId {
        self.next_id
    }

    pub fn get(&self, id: BookId) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }

    fn get_mut(&mut self, id: BookId) -> Result<&mut Book, CatalogError> {
        self.books
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(CatalogError::NotFound(id))
    }

    /// Validate a draft against the current year and append it.
    pub fn add_book(&mut self, draft: &BookDraft) -> Result<BookId, CatalogError> {
        self.add_book_as_of(draft, current_year())
    }

    /// Same as `add_book` with an explicit upper bound for the publication
    /// year.
    pub fn add_book_as_of(
        &mut self,
        draft: &BookDraft,
        current_year: i64,
    ) -> Result<BookId, CatalogError> {
        let missing = draft.missing_fields();
        if !missing.is_empty() {
            return Err(CatalogError::MissingField(missing));
        }

        let year_raw = draft.year.trim();
        let year = year_raw
            .parse::<i64>()
            .ok()
            .filter(|year| (MIN_YEAR..=current_year).contains(year))
            .ok_or_else(|| CatalogError::InvalidYear {
                value: year_raw.to_string(),
                max: current_year,
            })?;

        let price_raw = draft.price.trim();
        let price = price_raw
            .parse::<f64>()
            .ok()
            .filter(|price| price.is_finite() && *price >= 0.0)
            .ok_or_else(|| CatalogError::InvalidPrice(price_raw.to_string()))?;

        let id = self.next_id;
        let next_id = id.checked_add(1).ok_or(CatalogError::IdOutOfRange(id))?;
        self.books.push(Book {
            id,
            title: draft.title.trim().to_string(),
            author: draft.author.trim().to_string(),
            genre: draft.genre.trim().to_string(),
            year,
            // "-0" parses as negative zero; store it as plain zero.
            price: price + 0.0,
            available: true,
            ratings: Vec::new(),
        });
        self.next_id = next_id;
        Ok(id)
    }

    /// The book `delete_book` would remove.
    pub fn check_delete(&self, id: BookId) -> Result<&Book, CatalogError> {
        self.get(id).ok_or(CatalogError::NotFound(id))
    }

    pub fn delete_book(&mut self, id: BookId, confirmed: bool) -> Result<Outcome, CatalogError> {
        self.check_delete(id)?;
        if !confirmed {
            return Ok(Outcome::Cancelled);
        }
        self.books.retain(|b| b.id != id);
        Ok(Outcome::Completed)
    }

    /// The book `borrow_book` would lend out, or the reason it cannot be.
    pub fn check_borrow(&self, id: BookId) -> Result<&Book, CatalogError> {
        let book = self.get(id).ok_or(CatalogError::NotFound(id))?;
        if !book.available {
            return Err(CatalogError::NotAvailable {
                id,
                title: book.title.clone(),
            });
        }
        Ok(book)
    }

    pub fn borrow_book(&mut self, id: BookId, confirmed: bool) -> Result<Outcome, CatalogError> {
        self.check_borrow(id)?;
        if confirmed {
            self.get_mut(id)?.available = false;
        }
        Ok(Outcome::from_confirmation(confirmed))
    }

    /// The book `return_book` would take back, or the reason it cannot be.
    pub fn check_return(&self, id: BookId) -> Result<&Book, CatalogError> {
        let book = self.get(id).ok_or(CatalogError::NotFound(id))?;
        if book.available {
            return Err(CatalogError::NotBorrowed {
                id,
                title: book.title.clone(),
            });
        }
        Ok(book)
    }

    /// Take a borrowed book back and record the reader's rating in the same
    /// step. Once confirmed the return always happens; an out-of-range score
    /// is discarded and reported through `ReturnOutcome::RatingDiscarded`.
    /// Pass `None` for returns that skip the rating.
    pub fn return_book(
        &mut self,
        id: BookId,
        confirmed: bool,
        rating: Option<i64>,
    ) -> Result<ReturnOutcome, CatalogError> {
        self.check_return(id)?;
        if !confirmed {
            return Ok(ReturnOutcome::Cancelled);
        }

        let book = self.get_mut(id)?;
        book.available = true;
        Ok(match rating.map(validate_rating) {
            None => ReturnOutcome::Returned { rating: None },
            Some(Ok(score)) => {
                book.ratings.push(score);
                ReturnOutcome::Returned {
                    rating: Some(score),
                }
            }
            Some(Err(err)) => ReturnOutcome::RatingDiscarded(err),
        })
    }

    pub fn rate_book(&mut self, id: BookId, rating: i64) -> Result<(), CatalogError> {
        let score = validate_rating(rating)?;
        self.get_mut(id)?.ratings.push(score);
        Ok(())
    }

    /// Books ordered by `key`. Ties keep catalog order and the stored order is
    /// left untouched.
    pub fn sorted(&self, key: SortKey) -> impl Iterator<Item = &Book> + '_ {
        let mut view: Vec<&Book> = self.books.iter().collect();
        match key {
            SortKey::Id => view.sort_by_key(|b| b.id),
            SortKey::Title => view.sort_by(|a, b| a.title.cmp(&b.title)),
            SortKey::Author => view.sort_by(|a, b| a.author.cmp(&b.author)),
            SortKey::Price => view.sort_by(|a, b| a.price.total_cmp(&b.price)),
        }
        view.into_iter()
    }

    /// `sorted` keyed by a free-text column name; unknown names sort by id.
    pub fn sorted_by_name<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Book> + 'a {
        self.sorted(SortKey::parse_or_default(name))
    }

    /// Case-insensitive substring search over one text field. Both sides are
    /// Unicode case folded, so "STRASSE" finds "Straße".
    pub fn search(&self, field: &str, text: &str) -> Result<Vec<&Book>, CatalogError> {
        let field: SearchField = field.parse()?;
        Ok(self.search_field(field, text))
    }

    pub fn search_field(&self, field: SearchField, text: &str) -> Vec<&Book> {
        let needle = fold(text.trim());
        self.books
            .iter()
            .filter(|b| fold(b.field(field)).contains(&needle))
            .collect()
    }

    /// Case-insensitive exact match on genre.
    pub fn filter_by_genre(&self, genre: &str) -> Vec<&Book> {
        let target = fold(genre.trim());
        self.books
            .iter()
            .filter(|b| fold(&b.genre) == target)
            .collect()
    }
}

fn fold(text: &str) -> String {
    caseless::default_case_fold_str(text)
}

fn validate_rating(rating: i64) -> Result<u8, CatalogError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        // Range check above keeps this lossless.
        Ok(rating as u8)
    } else {
        Err(CatalogError::InvalidRating(rating))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YEAR: i64 = 2026;

    fn draft(title: &str, genre: &str, price: &str) -> BookDraft {
        BookDraft::new(title, "Some Author", genre, "1990", price)
    }

    fn titles<'a>(books: impl IntoIterator<Item = &'a Book>) -> Vec<&'a str> {
        books.into_iter().map(|b| b.title.as_str()).collect()
    }

    fn sample() -> Catalog {
        let mut catalog = Catalog::new();
        for (title, author, genre, price) in [
            ("Dune", "Frank Herbert", "Sci-Fi", "9.99"),
            ("The Dune Chronicles", "Various", "sci-fi classics", "25"),
            ("Emma", "Jane Austen", "Romance", "4.5"),
            ("Annihilation", "Jeff VanderMeer", "SCI-FI", "12"),
        ] {
            catalog
                .add_book_as_of(&BookDraft::new(title, author, genre, "2000", price), YEAR)
                .unwrap();
        }
        catalog
    }

    #[test]
    fn add_assigns_sequential_ids_and_defaults() {
        let mut catalog = Catalog::new();
        let first = catalog.add_book_as_of(&draft("A", "X", "1"), YEAR).unwrap();
        let second = catalog.add_book_as_of(&draft("B", "X", "2"), YEAR).unwrap();
        assert_eq!((first, second), (1, 2));

        let book = catalog.get(2).unwrap();
        assert!(book.available);
        assert!(book.ratings.is_empty());
        assert_eq!(book.price, 2.0);
    }

    #[test]
    fn ids_are_not_reused_after_deletion() {
        let mut catalog = Catalog::new();
        for title in ["A", "B", "C"] {
            catalog.add_book_as_of(&draft(title, "X", "1"), YEAR).unwrap();
        }
        assert_eq!(catalog.delete_book(3, true), Ok(Outcome::Completed));
        assert_eq!(catalog.delete_book(1, true), Ok(Outcome::Completed));

        let id = catalog.add_book_as_of(&draft("D", "X", "1"), YEAR).unwrap();
        assert_eq!(id, 4);
        let ids: Vec<_> = catalog.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn add_lists_every_missing_field() {
        let mut catalog = Catalog::new();
        let err = catalog
            .add_book_as_of(&BookDraft::new("", "Author", "  ", "", "3"), YEAR)
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::MissingField(vec!["title", "genre", "publication year"])
        );
        assert!(catalog.is_empty());
    }

    #[test]
    fn add_checks_year_bounds() {
        let mut catalog = Catalog::new();
        let cases = [
            ("999", false),
            ("1000", true),
            ("2026", true),
            ("2027", false),
            ("19.5", false),
            ("soon", false),
        ];
        for (year, ok) in cases {
            let result =
                catalog.add_book_as_of(&BookDraft::new("T", "A", "G", year, "1"), YEAR);
            assert_eq!(result.is_ok(), ok, "year {year}");
            if !ok {
                assert!(matches!(result, Err(CatalogError::InvalidYear { .. })));
            }
        }
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn add_checks_price_sign() {
        let mut catalog = Catalog::new();
        for (price, ok) in [("-0.01", false), ("0", true), ("0.01", true), ("abc", false)] {
            let result = catalog.add_book_as_of(&draft("T", "G", price), YEAR);
            assert_eq!(result.is_ok(), ok, "price {price}");
            if !ok {
                assert_eq!(result, Err(CatalogError::InvalidPrice(price.to_string())));
            }
        }
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn add_trims_text_fields() {
        let mut catalog = Catalog::new();
        let id = catalog
            .add_book_as_of(&BookDraft::new("  Dune ", " Herbert", "Sci-Fi ", " 1965 ", " 9 "), YEAR)
            .unwrap();
        let book = catalog.get(id).unwrap();
        assert_eq!(
            (book.title.as_str(), book.author.as_str(), book.genre.as_str(), book.year),
            ("Dune", "Herbert", "Sci-Fi", 1965)
        );
    }

    #[test]
    fn delete_requires_confirmation_and_existing_id() {
        let mut catalog = sample();
        assert_eq!(catalog.delete_book(2, false), Ok(Outcome::Cancelled));
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.delete_book(42, true), Err(CatalogError::NotFound(42)));
        assert_eq!(catalog.delete_book(2, true), Ok(Outcome::Completed));
        assert!(catalog.get(2).is_none());
    }

    #[test]
    fn borrow_flips_availability_once() {
        let mut catalog = sample();
        assert_eq!(catalog.borrow_book(1, false), Ok(Outcome::Cancelled));
        assert!(catalog.get(1).unwrap().available);

        assert_eq!(catalog.borrow_book(1, true), Ok(Outcome::Completed));
        assert!(!catalog.get(1).unwrap().available);

        assert_eq!(
            catalog.borrow_book(1, true),
            Err(CatalogError::NotAvailable {
                id: 1,
                title: "Dune".into()
            })
        );
        assert_eq!(catalog.borrow_book(9, true), Err(CatalogError::NotFound(9)));
    }

    #[test]
    fn borrow_then_return_appends_one_rating() {
        let mut catalog = sample();
        catalog.borrow_book(3, true).unwrap();
        assert_eq!(
            catalog.return_book(3, true, Some(4)),
            Ok(ReturnOutcome::Returned { rating: Some(4) })
        );

        let book = catalog.get(3).unwrap();
        assert!(book.available);
        assert_eq!(book.ratings, vec![4]);
    }

    #[test]
    fn return_rejects_available_books() {
        let mut catalog = sample();
        assert_eq!(
            catalog.return_book(1, true, Some(3)),
            Err(CatalogError::NotBorrowed {
                id: 1,
                title: "Dune".into()
            })
        );
        assert_eq!(catalog.return_book(77, true, Some(3)), Err(CatalogError::NotFound(77)));
    }

    #[test]
    fn return_with_invalid_rating_still_returns() {
        let mut catalog = sample();
        catalog.borrow_book(1, true).unwrap();
        let outcome = catalog.return_book(1, true, Some(6)).unwrap();
        assert_eq!(
            outcome,
            ReturnOutcome::RatingDiscarded(CatalogError::InvalidRating(6))
        );
        assert_eq!(outcome.outcome(), Outcome::Completed);

        let book = catalog.get(1).unwrap();
        assert!(book.available);
        assert!(book.ratings.is_empty());
    }

    #[test]
    fn declined_or_unattended_returns() {
        let mut catalog = sample();
        catalog.borrow_book(1, true).unwrap();
        assert_eq!(catalog.return_book(1, false, Some(5)), Ok(ReturnOutcome::Cancelled));
        assert!(!catalog.get(1).unwrap().available);

        assert_eq!(
            catalog.return_book(1, true, None),
            Ok(ReturnOutcome::Returned { rating: None })
        );
        let book = catalog.get(1).unwrap();
        assert!(book.available);
        assert!(book.ratings.is_empty());
    }

    #[test]
    fn rate_appends_valid_scores_only() {
        let mut catalog = sample();
        catalog.rate_book(1, 5).unwrap();
        catalog.rate_book(1, 1).unwrap();
        assert_eq!(catalog.rate_book(1, 0), Err(CatalogError::InvalidRating(0)));
        assert_eq!(catalog.rate_book(1, 6), Err(CatalogError::InvalidRating(6)));
        assert_eq!(catalog.rate_book(99, 3), Err(CatalogError::NotFound(99)));
        assert_eq!(catalog.get(1).unwrap().ratings, vec![5, 1]);
    }

    #[test]
    fn invalid_rating_is_reported_before_missing_book() {
        let mut catalog = sample();
        assert_eq!(catalog.rate_book(99, 9), Err(CatalogError::InvalidRating(9)));
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let catalog = sample();
        let hits = catalog.search("title", "dune").unwrap();
        assert_eq!(titles(hits), vec!["Dune", "The Dune Chronicles"]);

        let hits = catalog.search(" Author ", "  AUSTEN ").unwrap();
        assert_eq!(titles(hits), vec!["Emma"]);

        assert!(catalog.search("genre", "western").unwrap().is_empty());
    }

    #[test]
    fn search_rejects_unknown_field() {
        let catalog = sample();
        assert_eq!(
            catalog.search("price", "9"),
            Err(CatalogError::InvalidCriterion("price".into()))
        );
    }

    #[test]
    fn genre_filter_is_exact() {
        let catalog = sample();
        let hits = catalog.filter_by_genre("SCI-FI");
        assert_eq!(titles(hits), vec!["Dune", "Annihilation"]);
        assert!(catalog.filter_by_genre("sci").is_empty());
    }

    #[test]
    fn sort_orders_without_mutating() {
        let catalog = sample();
        let by_price = titles(catalog.sorted(SortKey::Price));
        assert_eq!(by_price, vec!["Emma", "Dune", "Annihilation", "The Dune Chronicles"]);

        let by_title = titles(catalog.sorted_by_name("TITLE"));
        assert_eq!(by_title, vec!["Annihilation", "Dune", "Emma", "The Dune Chronicles"]);

        let ids: Vec<_> = catalog.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn sort_by_id_is_idempotent() {
        let mut catalog = sample();
        catalog.delete_book(2, true).unwrap();
        catalog.add_book_as_of(&draft("Zed", "X", "1"), YEAR).unwrap();

        let first: Vec<_> = catalog.sorted_by_name("id").map(|b| b.id).collect();
        let second: Vec<_> = catalog.sorted_by_name("id").map(|b| b.id).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![1, 3, 4, 5]);
    }

    #[test]
    fn unknown_sort_key_falls_back_to_id() {
        let catalog = sample();
        let ids: Vec<_> = catalog.sorted_by_name("genre").map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn search_and_genre_use_full_case_folding() {
        let mut catalog = Catalog::new();
        catalog
            .add_book_as_of(&BookDraft::new("Die Straße", "Anon", "Roman", "1990", "8"), YEAR)
            .unwrap();
        catalog
            .add_book_as_of(&BookDraft::new("Emma", "Austen", "ΣΟΦΙΑ", "1990", "8"), YEAR)
            .unwrap();

        assert_eq!(titles(catalog.search("title", "STRASSE").unwrap()), vec!["Die Straße"]);
        assert_eq!(titles(catalog.filter_by_genre("σοφια")), vec!["Emma"]);
    }

    #[test]
    fn from_parts_never_lowers_next_id() {
        let catalog = Catalog::from_parts(sample().books().to_vec(), 2).unwrap();
        assert_eq!(catalog.next_id(), 5);
        let catalog = Catalog::from_parts(Vec::new(), 12).unwrap();
        assert_eq!(catalog.next_id(), 12);
        let catalog = Catalog::from_parts(Vec::new(), 0).unwrap();
        assert_eq!(catalog.next_id(), 1);
    }

    #[test]
    fn largest_id_leaves_no_successor() {
        let mut books = sample().books().to_vec();
        books[0].id = BookId::MAX;
        assert_eq!(
            Catalog::from_parts(books, 1),
            Err(CatalogError::IdOutOfRange(BookId::MAX))
        );
    }

    #[test]
    fn add_stops_when_ids_run_out() {
        let mut catalog = Catalog::from_parts(Vec::new(), BookId::MAX).unwrap();
        assert_eq!(
            catalog.add_book_as_of(&draft("Last", "X", "1"), YEAR),
            Err(CatalogError::IdOutOfRange(BookId::MAX))
        );
        assert!(catalog.is_empty());
        assert_eq!(catalog.next_id(), BookId::MAX);
    }
}
