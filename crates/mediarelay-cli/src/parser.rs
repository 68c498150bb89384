//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Default location of the destination credentials file.
pub const DEFAULT_DESTINATIONS_FILE: &str = "destinations.json";

/// Default location of the relay history file.
pub const DEFAULT_HISTORY_FILE: &str = "mediarelay-history.json";

/// Command-line interface definition for the media relay.
///
/// This is the top-level parser that handles global options and dispatches
/// to subcommands.
#[derive(Parser)]
#[command(name = "mediarelay")]
#[command(about = "Download a media item once and upload it to several destinations")]
#[command(version)]
pub struct Cli {
    /// JSON file listing destinations: [{ "id", "label", "endpoint", "token" }]
    #[arg(
        long = "destinations-file",
        env = "MEDIARELAY_DESTINATIONS_FILE",
        default_value = DEFAULT_DESTINATIONS_FILE,
        global = true
    )]
    pub destinations_file: PathBuf,

    /// File recording previously relayed source ids
    #[arg(
        long = "history-file",
        env = "MEDIARELAY_HISTORY_FILE",
        default_value = DEFAULT_HISTORY_FILE,
        global = true
    )]
    pub history_file: PathBuf,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", env = "MEDIARELAY_VERBOSE", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Default tracing filter for this invocation.
    #[must_use]
    pub const fn default_log_filter(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}
