use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::catalog::Catalog;
use crate::models::{Book, BookId, MAX_RATING, MIN_RATING};

/// Key in `catalog_meta` holding the id the next new book will receive.
const NEXT_ID_KEY: &str = "next_id";

/// Read every book in stored order along with its rating history.
pub fn load_catalog(conn: &Connection) -> Result<Catalog> {
    let mut ratings = fetch_ratings(conn)?;

    let mut stmt = conn
        .prepare(
            "SELECT id, title, author, genre, year, price, available
             FROM books
             ORDER BY position, id",
        )
        .context("failed to prepare book query")?;

    let books = stmt
        .query_map([], |row| {
            Ok(Book {
                id: row.get(0)?,
                title: row.get(1)?,
                author: row.get(2)?,
                genre: row.get(3)?,
                year: row.get(4)?,
                price: row.get(5)?,
                available: row.get(6)?,
                ratings: Vec::new(),
            })
        })
        .context("failed to load books")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect books")?
        .into_iter()
        .map(|mut book| {
            book.ratings = ratings.remove(&book.id).unwrap_or_default();
            book
        })
        .collect::<Vec<_>>();

    let next_id = fetch_next_id(conn)?.unwrap_or(1);
    debug!(books = books.len(), next_id, "catalog loaded from store");
    Ok(Catalog::from_parts(books, next_id)?)
}

/// Replace the stored catalog with `catalog` in a single transaction. Either
/// the whole new state lands or the previous one stays.
pub fn save_catalog(conn: &mut Connection, catalog: &Catalog) -> Result<()> {
    let tx = conn.transaction().context("failed to start transaction")?;

    tx.execute("DELETE FROM ratings", [])
        .context("failed to clear ratings")?;
    tx.execute("DELETE FROM books", [])
        .context("failed to clear books")?;

    {
        let mut insert_book = tx
            .prepare(
                "INSERT INTO books (id, position, title, author, genre, year, price, available)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .context("failed to prepare book insert")?;
        let mut insert_rating = tx
            .prepare("INSERT INTO ratings (book_id, seq, score) VALUES (?1, ?2, ?3)")
            .context("failed to prepare rating insert")?;

        for (position, book) in catalog.iter().enumerate() {
            insert_book
                .execute(params![
                    book.id,
                    position as i64,
                    book.title,
                    book.author,
                    book.genre,
                    book.year,
                    book.price,
                    book.available,
                ])
                .with_context(|| format!("failed to insert book {}", book.id))?;

            for (seq, score) in book.ratings.iter().enumerate() {
                insert_rating
                    .execute(params![book.id, seq as i64, score])
                    .with_context(|| format!("failed to insert rating for book {}", book.id))?;
            }
        }
    }

    tx.execute(
        "INSERT INTO catalog_meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![NEXT_ID_KEY, catalog.next_id()],
    )
    .context("failed to store next id")?;

    tx.commit().context("failed to commit catalog")?;
    Ok(())
}

/// Group every stored rating by book, keeping the order they were given in.
fn fetch_ratings(conn: &Connection) -> Result<HashMap<BookId, Vec<u8>>> {
    let mut stmt = conn
        .prepare("SELECT book_id, score FROM ratings ORDER BY book_id, seq")
        .context("failed to prepare ratings query")?;

    let mut rows = stmt.query([]).context("failed to execute ratings query")?;

    let mut ratings: HashMap<BookId, Vec<u8>> = HashMap::new();
    while let Some(row) = rows.next().context("failed to fetch rating row")? {
        let book_id: BookId = row.get(0).context("failed to read rating book id")?;
        let score: i64 = row.get(1).context("failed to read rating score")?;
        if !(MIN_RATING..=MAX_RATING).contains(&score) {
            return Err(anyhow!("Stored rating {score} for book {book_id} is out of range."));
        }
        ratings.entry(book_id).or_default().push(score as u8);
    }

    Ok(ratings)
}

fn fetch_next_id(conn: &Connection) -> Result<Option<BookId>> {
    conn.query_row(
        "SELECT value FROM catalog_meta WHERE key = ?1",
        params![NEXT_ID_KEY],
        |row| row.get(0),
    )
    .optional()
    .context("failed to read next id")
}
