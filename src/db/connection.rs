use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Open (or create) the catalog database at `path`, run lazy migrations, and
/// return a live connection. `PRAGMA foreign_keys = ON` keeps the cascade from
/// `books` to `ratings` working the same way in tests and real runs.
pub fn open_store(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(path).context("failed to open SQLite database")?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// Throwaway database used by tests.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    ensure_schema(&conn)?;
    Ok(conn)
}

fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY,
            position INTEGER NOT NULL,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            genre TEXT NOT NULL,
            year INTEGER NOT NULL,
            price REAL NOT NULL,
            available INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )
    .context("failed to create books table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS ratings (
            book_id INTEGER NOT NULL,
            seq INTEGER NOT NULL,
            score INTEGER NOT NULL,
            PRIMARY KEY (book_id, seq),
            FOREIGN KEY(book_id) REFERENCES books(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create ratings table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS catalog_meta (
            key TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        )",
        [],
    )
    .context("failed to create catalog_meta table")?;

    Ok(())
}
