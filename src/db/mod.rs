//! Persistence module split across logical submodules.

mod books;
mod connection;

pub use books::{load_catalog, save_catalog};
pub use connection::{open_in_memory, open_store};
