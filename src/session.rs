//! Owns the catalog for the lifetime of the process together with the store
//! it came from. Persistence problems never end the session: a store that
//! cannot be read yields an empty catalog, and a failed save leaves the
//! in-memory state untouched.

use std::path::Path;

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::db::{load_catalog, open_in_memory, open_store, save_catalog};

pub struct Session {
    catalog: Catalog,
    conn: Option<Connection>,
}

impl Session {
    /// Open the store at `path` and load the catalog. The second value is a
    /// user-facing warning when the store could not be opened or read.
    pub fn open(path: &Path) -> (Self, Option<String>) {
        match open_store(path) {
            Ok(conn) => Self::from_connection(conn),
            Err(err) => {
                warn!(path = %path.display(), error = %format!("{err:#}"), "store unavailable");
                let session = Self {
                    catalog: Catalog::new(),
                    conn: None,
                };
                let message = format!(
                    "Could not open {}: {}. Starting with an empty catalog; changes will not be saved.",
                    path.display(),
                    root_cause(&err)
                );
                (session, Some(message))
            }
        }
    }

    /// Session over an existing connection, degrading to an empty catalog
    /// when the stored rows cannot be read.
    pub fn from_connection(conn: Connection) -> (Self, Option<String>) {
        match load_catalog(&conn) {
            Ok(catalog) => {
                info!(books = catalog.len(), "catalog ready");
                (
                    Self {
                        catalog,
                        conn: Some(conn),
                    },
                    None,
                )
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "stored catalog is unreadable");
                let message = format!(
                    "Stored catalog is corrupt ({}). Starting with an empty catalog.",
                    root_cause(&err)
                );
                (
                    Self {
                        catalog: Catalog::new(),
                        conn: Some(conn),
                    },
                    Some(message),
                )
            }
        }
    }

    pub fn in_memory() -> Result<Self> {
        let (session, _) = Self::from_connection(open_in_memory()?);
        Ok(session)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    /// Swap in a whole new catalog, e.g. after a JSON import. The caller
    /// still has to `save`.
    pub fn replace_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
    }

    /// Write the whole catalog back to the store.
    pub fn save(&mut self) -> Result<()> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| anyhow!("No writable store; changes were not saved."))?;
        match save_catalog(conn, &self.catalog) {
            Ok(()) => {
                info!(books = self.catalog.len(), "catalog saved");
                Ok(())
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "save skipped");
                Err(err)
            }
        }
    }
}

fn root_cause(err: &anyhow::Error) -> String {
    err.root_cause().to_string()
}
