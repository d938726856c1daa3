//! File exchange outside the SQLite store: a CSV projection for
//! spreadsheets and a JSON document carrying the full records.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::Catalog;
use crate::models::{Book, BookId, MAX_RATING, MIN_RATING};

/// Column order of the CSV export.
pub const CSV_HEADER: [&str; 7] = ["id", "title", "author", "genre", "year", "price", "available"];

/// Render the tabular projection of the catalog, one row per book in catalog
/// order. Ratings are not part of the projection.
pub fn render_csv(catalog: &Catalog) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');
    for book in catalog.iter() {
        let row = [
            book.id.to_string(),
            csv_field(&book.title),
            csv_field(&book.author),
            csv_field(&book.genre),
            book.year.to_string(),
            format!("{:.2}", book.price),
            book.available.to_string(),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

pub fn export_csv(catalog: &Catalog, path: &Path) -> Result<()> {
    write_file(path, render_csv(catalog).as_bytes())
        .with_context(|| format!("failed to export CSV to {}", path.display()))?;
    info!(path = %path.display(), books = catalog.len(), "catalog exported as CSV");
    Ok(())
}

/// Quote a field when it would otherwise break the row.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CatalogDocument {
    next_id: BookId,
    books: Vec<Book>,
}

/// Older exports may be a bare list of books.
#[derive(Deserialize)]
#[serde(untagged)]
enum IncomingDocument {
    Full(CatalogDocument),
    BooksOnly(Vec<Book>),
}

pub fn render_json(catalog: &Catalog) -> Result<String> {
    let document = CatalogDocument {
        next_id: catalog.next_id(),
        books: catalog.books().to_vec(),
    };
    serde_json::to_string_pretty(&document).context("failed to serialize catalog")
}

pub fn export_json(catalog: &Catalog, path: &Path) -> Result<()> {
    let json = render_json(catalog)?;
    write_file(path, json.as_bytes())
        .with_context(|| format!("failed to export JSON to {}", path.display()))?;
    info!(path = %path.display(), books = catalog.len(), "catalog exported as JSON");
    Ok(())
}

/// Parse a JSON export and check the invariants the catalog relies on.
pub fn parse_json(json: &str) -> Result<Catalog> {
    let incoming: IncomingDocument =
        serde_json::from_str(json).context("catalog file is corrupt or badly formatted")?;
    let (books, next_id) = match incoming {
        IncomingDocument::Full(doc) => (doc.books, doc.next_id),
        IncomingDocument::BooksOnly(books) => (books, 1),
    };

    let mut seen = HashSet::new();
    for book in &books {
        if book.id < 1 {
            bail!("Book '{}' has invalid id {}.", book.title, book.id);
        }
        if !seen.insert(book.id) {
            bail!("Duplicate book id {}.", book.id);
        }
        if !book.price.is_finite() || book.price < 0.0 {
            bail!("Book {} has a negative or invalid price.", book.id);
        }
        if let Some(score) = book
            .ratings
            .iter()
            .find(|&&r| !(MIN_RATING..=MAX_RATING).contains(&i64::from(r)))
        {
            return Err(anyhow!("Book {} has out-of-range rating {score}.", book.id));
        }
    }

    Ok(Catalog::from_parts(books, next_id)?)
}

pub fn import_json(path: &Path) -> Result<Catalog> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let catalog = parse_json(&json)?;
    info!(path = %path.display(), books = catalog.len(), "catalog imported from JSON");
    Ok(catalog)
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("failed to create export directory")?;
    }
    fs::write(path, contents).context("failed to write file")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookDraft;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .add_book_as_of(&BookDraft::new("Dune", "Frank Herbert", "Sci-Fi", "1965", "9.5"), 2026)
            .unwrap();
        catalog
            .add_book_as_of(
                &BookDraft::new("Good Omens", "Pratchett, Gaiman", "Fantasy", "1990", "12"),
                2026,
            )
            .unwrap();
        catalog
            .add_book_as_of(
                &BookDraft::new("The \"Best\" Of", "Anon", "Misc", "2000", "0"),
                2026,
            )
            .unwrap();
        catalog.borrow_book(2, true).unwrap();
        catalog
    }

    #[test]
    fn csv_has_header_and_quoted_fields() {
        let csv = render_csv(&catalog());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "id,title,author,genre,year,price,available");
        assert_eq!(lines[1], "1,Dune,Frank Herbert,Sci-Fi,1965,9.50,true");
        assert_eq!(lines[2], "2,Good Omens,\"Pratchett, Gaiman\",Fantasy,1990,12.00,false");
        assert_eq!(lines[3], "3,\"The \"\"Best\"\" Of\",Anon,Misc,2000,0.00,true");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn json_document_restores_counter() {
        let mut original = catalog();
        original.delete_book(3, true).unwrap();
        original.rate_book(1, 5).unwrap();

        let restored = parse_json(&render_json(&original).unwrap()).unwrap();
        assert_eq!(restored, original);
        assert_eq!(restored.next_id(), 4);
    }

    #[test]
    fn bare_book_list_is_accepted() {
        let json = r#"[{"id": 7, "title": "Emma", "author": "Austen", "genre": "Novel",
                        "year": 1815, "price": 3.0, "available": true}]"#;
        let catalog = parse_json(json).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get(7).unwrap().ratings.is_empty());
        assert_eq!(catalog.next_id(), 8);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let json = r#"[
            {"id": 1, "title": "A", "author": "X", "genre": "G", "year": 2000, "price": 1.0, "available": true},
            {"id": 1, "title": "B", "author": "X", "genre": "G", "year": 2000, "price": 1.0, "available": true}
        ]"#;
        let err = parse_json(json).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate book id 1.");
    }

    #[test]
    fn bad_ratings_are_rejected() {
        let json = r#"{"next_id": 2, "books": [
            {"id": 1, "title": "A", "author": "X", "genre": "G", "year": 2000, "price": 1.0,
             "available": true, "ratings": [3, 0]}
        ]}"#;
        assert!(parse_json(json).is_err());
    }

    #[test]
    fn largest_possible_id_is_rejected() {
        let json = r#"[{"id": 9223372036854775807, "title": "Emma", "author": "Austen",
                        "genre": "Novel", "year": 1815, "price": 3.0, "available": true}]"#;
        let err = parse_json(json).unwrap_err();
        assert_eq!(err.to_string(), "Book ID 9223372036854775807 is out of range.");
    }

    #[test]
    fn garbage_is_reported_as_corrupt() {
        let err = parse_json("{ not json").unwrap_err();
        assert!(err.to_string().contains("corrupt"));
    }
}
