//! Inbound transfer: state, control handle, chunking and the downloader.

mod chunk_cursor;
mod downloader;
mod state;

pub use chunk_cursor::{ChunkCursor, ChunkSpan};
pub use downloader::Downloader;
pub use state::{ProgressUpdate, TransferHandle, TransferState};
