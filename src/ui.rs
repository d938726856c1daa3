//! Ratatui front-end. A single book table with modal dialogs layered on top:
//! the add form, yes/no confirmations, the rating prompt, and the search and
//! genre prompts. Catalog rules live in `crate::catalog`; this layer only
//! collects input, resolves confirmations, and shows results.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
