//! Binary entry point: resolve paths, start logging, open the catalog store,
//! then either run one command or hand control to the Ratatui event loop.
use std::io;

use anyhow::Result;
use bookshelf::{init_logging, run_app, run_command, App, AppConfig, Cli, Session};
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::resolve(cli.data_dir.clone(), cli.db.clone(), cli.log_dir.clone())?;

    // Logging is optional; the catalog works without it.
    let _guard = match init_logging(&config.log_dir) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    let (mut session, warning) = Session::open(&config.db_path);

    match cli.command {
        Some(command) => {
            if let Some(warning) = warning {
                eprintln!("warning: {warning}");
            }
            let stdout = io::stdout();
            run_command(&mut session, command, &mut stdout.lock())
        }
        None => {
            let mut app = App::new(session, config.csv_export_path(), warning);
            run_app(&mut app)
        }
    }
}
