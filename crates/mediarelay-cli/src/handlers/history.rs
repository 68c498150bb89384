//! History command handler.
//!
//! Works on the history file directly; no destinations file is needed.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use mediarelay_transfer::DuplicateIndex;

use crate::commands::HistoryCommand;
use crate::error::CliError;
use crate::history_file::JsonHistoryStore;

/// Execute a history subcommand.
pub fn execute(history_file: &Path, command: &HistoryCommand) -> Result<()> {
    let store = JsonHistoryStore::open(history_file).map_err(CliError::from)?;
    let index = DuplicateIndex::new(Arc::new(store));

    match command {
        HistoryCommand::Clear => {
            let dropped = index.clear().map_err(CliError::from)?;
            println!("Cleared {dropped} entries from {}", history_file.display());
        }
        HistoryCommand::Count => {
            println!("{} items relayed", index.len());
        }
    }
    Ok(())
}
