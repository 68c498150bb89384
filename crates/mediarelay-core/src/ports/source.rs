//! Source ports: resolving a locator and streaming its payload.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use thiserror::Error;

/// Errors reported by source adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The source could not be resolved or opened.
    #[error("Source unavailable: {message}")]
    Unavailable {
        /// Detailed error message.
        message: String,
        /// HTTP status code if available.
        status_code: Option<u16>,
    },

    /// The stream failed after it was opened.
    #[error("Stream error: {message}")]
    Stream {
        /// Detailed error message.
        message: String,
    },
}

impl SourceError {
    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            status_code: None,
        }
    }

    /// Create an unavailable error with an HTTP status code.
    pub fn unavailable_with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::Unavailable {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a stream error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }
}

/// What the resolver knows about a source before fetching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    /// Locator to hand to the fetcher.
    pub locator: String,
    /// Advisory payload length; the fetched byte count wins.
    pub declared_len: Option<u64>,
    /// Display title.
    pub title: String,
    /// Description forwarded to destinations.
    pub description: String,
    /// Optional thumbnail to attach as a secondary artifact.
    pub thumbnail_locator: Option<String>,
}

impl ResolvedSource {
    /// Create a resolved source with only a locator and title.
    pub fn new(locator: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            declared_len: None,
            title: title.into(),
            description: String::new(),
            thumbnail_locator: None,
        }
    }

    /// Set the declared length.
    #[must_use]
    pub const fn with_declared_len(mut self, len: u64) -> Self {
        self.declared_len = Some(len);
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the thumbnail locator.
    #[must_use]
    pub fn with_thumbnail(mut self, locator: impl Into<String>) -> Self {
        self.thumbnail_locator = Some(locator.into());
        self
    }
}

/// Stream of inbound fragments.
pub type FragmentStream = BoxStream<'static, Result<Bytes, SourceError>>;

/// An opened source: the length the transport declared plus the fragments.
pub struct SourceStream {
    /// Length declared by the transport headers, if any.
    pub declared_len: Option<u64>,
    /// Inbound fragments in order.
    pub fragments: FragmentStream,
}

impl SourceStream {
    /// Wrap an already boxed fragment stream.
    #[must_use]
    pub fn new(declared_len: Option<u64>, fragments: FragmentStream) -> Self {
        Self {
            declared_len,
            fragments,
        }
    }

    /// Build a stream from a fixed list of fragment results.
    #[must_use]
    pub fn from_fragments(
        declared_len: Option<u64>,
        fragments: Vec<Result<Bytes, SourceError>>,
    ) -> Self {
        Self::new(declared_len, stream::iter(fragments).boxed())
    }
}

impl std::fmt::Debug for SourceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceStream")
            .field("declared_len", &self.declared_len)
            .finish_non_exhaustive()
    }
}

/// Port for turning a locator into fetchable source metadata.
#[async_trait]
pub trait SourceResolverPort: Send + Sync {
    /// Resolve a locator into a fetchable source.
    async fn resolve(&self, locator: &str) -> Result<ResolvedSource, SourceError>;
}

/// Port for opening a streamed fetch of a source.
#[async_trait]
pub trait SourceFetcherPort: Send + Sync {
    /// Open the source. Errors here mean no bytes were received.
    async fn open(&self, locator: &str) -> Result<SourceStream, SourceError>;
}
