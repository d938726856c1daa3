//! Read-only statistics over the catalog. Every figure is recomputed from the
//! current books on each call; nothing is cached.

use indexmap::IndexMap;

use crate::catalog::Catalog;
use crate::models::Book;

/// Placeholder shown when there is nothing to report.
pub const NOT_AVAILABLE: &str = "N/A";

/// A book singled out by price.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHighlight {
    pub title: String,
    pub price: f64,
}

/// A book singled out by its mean rating.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingHighlight {
    pub title: String,
    pub average: f64,
}

impl PriceHighlight {
    fn placeholder() -> Self {
        Self {
            title: NOT_AVAILABLE.to_string(),
            price: 0.0,
        }
    }
}

impl RatingHighlight {
    fn placeholder() -> Self {
        Self {
            title: NOT_AVAILABLE.to_string(),
            average: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub total_count: usize,
    pub available_count: usize,
    pub borrowed_count: usize,
    pub total_value: f64,
    pub top_genre: String,
    pub most_expensive: PriceHighlight,
    pub cheapest: PriceHighlight,
    pub best_rated: RatingHighlight,
    pub worst_rated: RatingHighlight,
}

/// Build a snapshot of the catalog statistics.
pub fn generate_report(catalog: &Catalog) -> Report {
    let books = catalog.books();
    let total_count = books.len();
    let available_count = books.iter().filter(|b| b.available).count();

    let most_expensive = first_by(books.iter(), |b| b.price, |candidate, best| candidate > best)
        .map(price_highlight)
        .unwrap_or_else(PriceHighlight::placeholder);
    let cheapest = first_by(books.iter(), |b| b.price, |candidate, best| candidate < best)
        .map(price_highlight)
        .unwrap_or_else(PriceHighlight::placeholder);

    let rated = || {
        books
            .iter()
            .filter_map(|b| b.average_rating().map(|average| (b, average)))
    };
    let best_rated = first_by(rated(), |(_, avg)| *avg, |candidate, best| candidate > best)
        .map(rating_highlight)
        .unwrap_or_else(RatingHighlight::placeholder);
    let worst_rated = first_by(rated(), |(_, avg)| *avg, |candidate, best| candidate < best)
        .map(rating_highlight)
        .unwrap_or_else(RatingHighlight::placeholder);

    Report {
        total_count,
        available_count,
        borrowed_count: total_count - available_count,
        total_value: books.iter().map(|b| b.price).sum(),
        top_genre: top_genre(books).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        most_expensive,
        cheapest,
        best_rated,
        worst_rated,
    }
}

/// Most frequent genre. Counting goes through an insertion-ordered map so a
/// tie resolves to the genre seen first.
fn top_genre(books: &[Book]) -> Option<String> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for book in books {
        *counts.entry(book.genre.as_str()).or_insert(0) += 1;
    }
    first_by(counts.into_iter(), |(_, count)| *count, |candidate, best| candidate > best)
        .map(|(genre, _)| genre.to_string())
}

/// Keep the earliest element unless a later one strictly beats it. Unlike
/// `Iterator::max_by`, this returns the *first* extreme on ties.
fn first_by<T, K: Copy>(
    items: impl Iterator<Item = T>,
    key: impl Fn(&T) -> K,
    beats: impl Fn(K, K) -> bool,
) -> Option<T> {
    items.reduce(|best, candidate| {
        if beats(key(&candidate), key(&best)) {
            candidate
        } else {
            best
        }
    })
}

fn price_highlight(book: &Book) -> PriceHighlight {
    PriceHighlight {
        title: book.title.clone(),
        price: book.price,
    }
}

fn rating_highlight((book, average): (&Book, f64)) -> RatingHighlight {
    RatingHighlight {
        title: book.title.clone(),
        average,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookDraft;

    fn catalog_of(rows: &[(&str, &str, &str)]) -> Catalog {
        let mut catalog = Catalog::new();
        for (title, genre, price) in rows {
            catalog
                .add_book_as_of(&BookDraft::new(*title, "Author", *genre, "2001", *price), 2026)
                .unwrap();
        }
        catalog
    }

    #[test]
    fn empty_catalog_uses_placeholders() {
        let report = generate_report(&Catalog::new());
        assert_eq!(report.total_count, 0);
        assert_eq!(report.available_count, 0);
        assert_eq!(report.borrowed_count, 0);
        assert_eq!(report.total_value, 0.0);
        assert_eq!(report.top_genre, "N/A");
        assert_eq!(report.most_expensive, PriceHighlight::placeholder());
        assert_eq!(report.cheapest, PriceHighlight::placeholder());
        assert_eq!(report.best_rated, RatingHighlight::placeholder());
        assert_eq!(report.worst_rated.average, 0.0);
    }

    #[test]
    fn three_book_scenario() {
        let catalog = catalog_of(&[("A", "X", "10"), ("B", "X", "30"), ("C", "Y", "20")]);
        let report = generate_report(&catalog);
        assert_eq!(report.total_value, 60.0);
        assert_eq!(report.top_genre, "X");
        assert_eq!(
            report.most_expensive,
            PriceHighlight {
                title: "B".into(),
                price: 30.0
            }
        );
        assert_eq!(
            report.cheapest,
            PriceHighlight {
                title: "A".into(),
                price: 10.0
            }
        );
    }

    #[test]
    fn ties_resolve_to_first_in_catalog_order() {
        let catalog = catalog_of(&[
            ("A", "Y", "5"),
            ("B", "X", "5"),
            ("C", "X", "1"),
            ("D", "Y", "1"),
        ]);
        let report = generate_report(&catalog);
        assert_eq!(report.top_genre, "Y");
        assert_eq!(report.most_expensive.title, "A");
        assert_eq!(report.cheapest.title, "C");
    }

    #[test]
    fn availability_counts() {
        let mut catalog = catalog_of(&[("A", "X", "1"), ("B", "X", "1"), ("C", "X", "1")]);
        catalog.borrow_book(2, true).unwrap();
        let report = generate_report(&catalog);
        assert_eq!(
            (report.total_count, report.available_count, report.borrowed_count),
            (3, 2, 1)
        );
    }

    #[test]
    fn rating_highlights_skip_unrated_books() {
        let mut catalog = catalog_of(&[
            ("Unrated", "X", "1"),
            ("Loved", "X", "1"),
            ("Mixed", "X", "1"),
            ("AlsoLoved", "X", "1"),
        ]);
        catalog.rate_book(2, 5).unwrap();
        catalog.rate_book(3, 2).unwrap();
        catalog.rate_book(3, 3).unwrap();
        catalog.rate_book(4, 5).unwrap();

        let report = generate_report(&catalog);
        assert_eq!(
            report.best_rated,
            RatingHighlight {
                title: "Loved".into(),
                average: 5.0
            }
        );
        assert_eq!(
            report.worst_rated,
            RatingHighlight {
                title: "Mixed".into(),
                average: 2.5
            }
        );
    }

    #[test]
    fn report_does_not_touch_the_catalog() {
        let catalog = catalog_of(&[("A", "X", "1")]);
        let before = catalog.clone();
        let _ = generate_report(&catalog);
        assert_eq!(catalog, before);
    }
}
