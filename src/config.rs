use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories::BaseDirs;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".bookshelf";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "catalog.sqlite";
/// File name used by the "export CSV" shortcut.
const CSV_EXPORT_NAME: &str = "catalog.csv";

/// Resolved locations for everything the application reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub export_dir: PathBuf,
}

impl AppConfig {
    /// Every path derived from a single data directory.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            db_path: data_dir.join(DB_FILE_NAME),
            log_dir: data_dir.join("logs"),
            export_dir: data_dir.to_path_buf(),
        }
    }

    /// Combine explicit overrides (flags or environment, already merged by
    /// clap) with the defaults under the home directory.
    pub fn resolve(
        data_dir: Option<PathBuf>,
        db_path: Option<PathBuf>,
        log_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        let mut config = Self::in_dir(&data_dir);
        if let Some(db_path) = db_path {
            config.db_path = db_path;
        }
        if let Some(log_dir) = log_dir {
            config.log_dir = log_dir;
        }
        Ok(config)
    }

    pub fn csv_export_path(&self) -> PathBuf {
        self.export_dir.join(CSV_EXPORT_NAME)
    }
}

/// Resolve the default data directory inside the user's home.
fn default_data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}
