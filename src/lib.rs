//! Core library surface for the bookshelf catalog manager.
//!
//! `catalog`, `models`, `error` and `report` hold the pure record model and
//! its rules. `db`, `transfer` and `session` sit at the persistence boundary,
//! while `ui` and `cli` are the two front-ends the binary chooses between.
pub mod catalog;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod report;
pub mod session;
pub mod transfer;
pub mod ui;

pub use catalog::Catalog;
pub use cli::{run_command, Cli, Command};
pub use config::AppConfig;
pub use error::CatalogError;
pub use logging::init_logging;
pub use models::{Book, BookDraft, BookId, Outcome, ReturnOutcome, SearchField, SortKey};
pub use report::{generate_report, Report};
pub use session::Session;

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
