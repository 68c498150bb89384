//! Console output for relay progress, lifecycle events and reports.
//!
//! Keep this module format-only: engine behaviour lives in the transfer
//! crate.

mod console;
mod report;

pub use console::{ConsoleProgressSink, LogEventEmitter, format_bytes, format_progress};
pub use report::{format_report, print_report};
