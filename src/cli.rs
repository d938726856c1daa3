//! Non-interactive front-end. Every subcommand maps to one catalog operation;
//! confirmation-gated commands take `--yes` instead of prompting.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::catalog::Catalog;
use crate::models::{Book, BookDraft, BookId, Outcome, ReturnOutcome};
use crate::report::{generate_report, Report};
use crate::session::Session;
use crate::transfer::{export_csv, export_json, import_json};

#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about = "Manage a personal book catalog")]
pub struct Cli {
    /// Directory holding the database, logs and exports
    #[arg(long, env = "BOOKSHELF_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// SQLite database file (overrides the one in the data directory)
    #[arg(long, env = "BOOKSHELF_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Directory for bookshelf.log
    #[arg(long, env = "BOOKSHELF_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Run a single command instead of the interactive interface
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a book
    Add {
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        author: String,
        #[arg(long, default_value = "")]
        genre: String,
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        year: String,
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        price: String,
    },
    /// List every book
    List {
        /// id, title, author or price (anything else sorts by id)
        #[arg(long, default_value = "id")]
        sort: String,
    },
    /// Case-insensitive substring search on title, author or genre
    Search { field: String, text: String },
    /// Books whose genre matches exactly, ignoring case
    Genre { genre: String },
    /// Lend a book out
    Borrow {
        id: BookId,
        #[arg(long)]
        yes: bool,
    },
    /// Take a borrowed book back and rate it
    Return {
        id: BookId,
        #[arg(long)]
        yes: bool,
        #[arg(
            long,
            allow_negative_numbers = true,
            conflicts_with = "no_rating",
            required_unless_present = "no_rating"
        )]
        rating: Option<i64>,
        /// Return without recording a rating
        #[arg(long)]
        no_rating: bool,
    },
    /// Record a 1-5 rating
    Rate {
        id: BookId,
        #[arg(allow_negative_numbers = true)]
        score: i64,
    },
    /// Remove a book
    Delete {
        id: BookId,
        #[arg(long)]
        yes: bool,
    },
    /// Print catalog statistics
    Report,
    /// Write the tabular projection as CSV
    ExportCsv { path: PathBuf },
    /// Write full records as JSON
    ExportJson { path: PathBuf },
    /// Replace the catalog with a JSON export
    ImportJson { path: PathBuf },
}

/// Execute one command against the session, writing results to `out`.
pub fn run_command(session: &mut Session, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Add {
            title,
            author,
            genre,
            year,
            price,
        } => {
            let draft = BookDraft::new(title, author, genre, year, price);
            let id = session.catalog_mut().add_book(&draft)?;
            info!(id, "book added");
            writeln!(out, "Book '{}' added with ID {id}.", draft.title.trim())?;
            save(session, out)
        }
        Command::List { sort } => {
            let catalog = session.catalog();
            print_books(out, catalog.sorted_by_name(&sort), catalog)
        }
        Command::Search { field, text } => {
            let catalog = session.catalog();
            let hits = catalog.search(&field, &text)?;
            print_books(out, hits, catalog)
        }
        Command::Genre { genre } => {
            let catalog = session.catalog();
            let hits = catalog.filter_by_genre(&genre);
            if hits.is_empty() {
                writeln!(out, "No book found in genre '{}'.", genre.trim())?;
                return Ok(());
            }
            print_books(out, hits, catalog)
        }
        Command::Borrow { id, yes } => {
            let outcome = session.catalog_mut().borrow_book(id, yes)?;
            finish(session, out, outcome, format!("Book ID {id} borrowed."), "Borrow")
        }
        Command::Return {
            id,
            yes,
            rating,
            no_rating,
        } => {
            let rating = if no_rating { None } else { rating };
            let returned = session.catalog_mut().return_book(id, yes, rating)?;
            let message = match &returned {
                ReturnOutcome::Returned {
                    rating: Some(score),
                } => format!("Book ID {id} returned and rated {score}/5."),
                ReturnOutcome::RatingDiscarded(err) => {
                    format!("Book ID {id} returned. Rating discarded: {err}")
                }
                _ => format!("Book ID {id} returned."),
            };
            finish(session, out, returned.outcome(), message, "Return")
        }
        Command::Rate { id, score } => {
            session.catalog_mut().rate_book(id, score)?;
            writeln!(out, "Book ID {id} rated {score}/5.")?;
            save(session, out)
        }
        Command::Delete { id, yes } => {
            let outcome = session.catalog_mut().delete_book(id, yes)?;
            finish(session, out, outcome, format!("Book ID {id} deleted."), "Deletion")
        }
        Command::Report => print_report(out, &generate_report(session.catalog())),
        Command::ExportCsv { path } => {
            export_csv(session.catalog(), &path)?;
            writeln!(out, "Catalog exported to {}.", path.display())?;
            Ok(())
        }
        Command::ExportJson { path } => {
            export_json(session.catalog(), &path)?;
            writeln!(out, "Catalog exported to {}.", path.display())?;
            Ok(())
        }
        Command::ImportJson { path } => {
            let catalog = import_json(&path)?;
            writeln!(out, "Imported {} book(s) from {}.", catalog.len(), path.display())?;
            session.replace_catalog(catalog);
            save(session, out)
        }
    }
}

fn finish(
    session: &mut Session,
    out: &mut impl Write,
    outcome: Outcome,
    done: String,
    action: &str,
) -> Result<()> {
    match outcome {
        Outcome::Completed => {
            writeln!(out, "{done}")?;
            save(session, out)
        }
        Outcome::Cancelled => {
            writeln!(out, "{action} cancelled (pass --yes to confirm).")?;
            Ok(())
        }
    }
}

/// Saving is best effort: a failure is reported but the command succeeded.
fn save(session: &mut Session, out: &mut impl Write) -> Result<()> {
    if let Err(err) = session.save() {
        writeln!(out, "warning: save skipped: {}", err.root_cause())?;
    }
    Ok(())
}

fn print_books<'a>(
    out: &mut impl Write,
    books: impl IntoIterator<Item = &'a Book>,
    catalog: &Catalog,
) -> Result<()> {
    if catalog.is_empty() {
        writeln!(out, "No books in the catalog.")?;
        return Ok(());
    }
    let books: Vec<&Book> = books.into_iter().collect();
    if books.is_empty() {
        writeln!(out, "No book matches.")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:>4}  {:<30}  {:<20}  {:<14}  {:>4}  {:>8}  {:<9}  Rating",
        "ID", "Title", "Author", "Genre", "Year", "Price", "Available"
    )?;
    for book in books {
        let rating = book
            .average_rating()
            .map(|avg| format!("{avg:.2}/5"))
            .unwrap_or_else(|| "N/A".to_string());
        writeln!(
            out,
            "{:>4}  {:<30}  {:<20}  {:<14}  {:>4}  {:>8.2}  {:<9}  {}",
            book.id,
            book.title,
            book.author,
            book.genre,
            book.year,
            book.price,
            if book.available { "yes" } else { "borrowed" },
            rating
        )?;
    }
    Ok(())
}

fn print_report(out: &mut impl Write, report: &Report) -> Result<()> {
    writeln!(out, "Library report")?;
    writeln!(out, "Total books:     {}", report.total_count)?;
    writeln!(out, "Available:       {}", report.available_count)?;
    writeln!(out, "Borrowed:        {}", report.borrowed_count)?;
    writeln!(out, "Total value:     {:.2}", report.total_value)?;
    writeln!(out, "Top genre:       {}", report.top_genre)?;
    writeln!(
        out,
        "Most expensive:  {} at {:.2}",
        report.most_expensive.title, report.most_expensive.price
    )?;
    writeln!(
        out,
        "Cheapest:        {} at {:.2}",
        report.cheapest.title, report.cheapest.price
    )?;
    writeln!(
        out,
        "Best rated:      {} ({:.2}/5)",
        report.best_rated.title, report.best_rated.average
    )?;
    writeln!(
        out,
        "Worst rated:     {} ({:.2}/5)",
        report.worst_rated.title, report.worst_rated.average
    )?;
    Ok(())
}
