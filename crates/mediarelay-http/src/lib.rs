//! reqwest adapters for the mediarelay ports.
//!
//! - `ReqwestSourceFetcher` - streamed GET of a source URL
//! - `DirectUrlResolver` - metadata for locators that are plain URLs
//! - `SessionUploadClient` - the 3-phase chunked session upload

#![deny(unused_crate_dependencies)]

// Dev-dependencies used only by the integration tests
#[cfg(test)]
use axum as _;
#[cfg(test)]
use mediarelay_transfer as _;
#[cfg(test)]
use tokio_util as _;

mod config;
mod destination;
mod error;
mod source;

// ============================================================================
// Public API
// ============================================================================

pub use config::HttpClientConfig;
pub use destination::SessionUploadClient;
pub use error::{HttpAdapterError, HttpResult};
pub use source::{DirectUrlResolver, ReqwestSourceFetcher};
