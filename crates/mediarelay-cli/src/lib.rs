//! The `mediarelay` command-line adapter.
//!
//! Thin layer over the relay engine: argument parsing, the composition
//! root, a JSON-file history store and console output.

#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;

// Used by the binary only
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod history_file;
pub mod parser;
pub mod presentation;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, CliContext, bootstrap, load_credentials};
pub use commands::{Commands, HistoryCommand};
pub use error::CliError;
pub use history_file::JsonHistoryStore;
pub use parser::Cli;
