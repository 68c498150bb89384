//! Source adapters: streamed GET and direct-URL resolution.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use url::Url;

use mediarelay_core::{ResolvedSource, SourceError, SourceFetcherPort, SourceResolverPort, SourceStream};

use crate::config::HttpClientConfig;
use crate::error::{HttpAdapterError, HttpResult, check_status};

/// Fetcher that streams a URL with a plain GET.
#[derive(Debug, Clone)]
pub struct ReqwestSourceFetcher {
    client: reqwest::Client,
}

impl ReqwestSourceFetcher {
    /// Create a fetcher from configuration.
    pub fn new(config: &HttpClientConfig) -> HttpResult<Self> {
        Ok(Self {
            client: config.build_streaming_client()?,
        })
    }

    /// Create a fetcher around an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn open_response(&self, locator: &str) -> HttpResult<reqwest::Response> {
        let url = Url::parse(locator)?;
        let response = self.client.get(url).send().await?;
        check_status(response).await
    }
}

#[async_trait]
impl SourceFetcherPort for ReqwestSourceFetcher {
    async fn open(&self, locator: &str) -> Result<SourceStream, SourceError> {
        let response = self
            .open_response(locator)
            .await
            .map_err(HttpAdapterError::into_unavailable)?;

        let declared_len = response.content_length();
        tracing::debug!(locator, declared_len, "Source stream opened");

        let fragments = response
            .bytes_stream()
            .map(|item| item.map_err(|e| SourceError::stream(e.to_string())))
            .boxed();
        Ok(SourceStream::new(declared_len, fragments))
    }
}

/// Resolver for locators that are already fetchable URLs.
///
/// Issues a HEAD request for the advisory length and derives the title from
/// the last path segment. A server that rejects HEAD is not an error; the
/// length then stays unknown until the fetch.
#[derive(Debug, Clone)]
pub struct DirectUrlResolver {
    client: reqwest::Client,
}

impl DirectUrlResolver {
    /// Create a resolver from configuration.
    pub fn new(config: &HttpClientConfig) -> HttpResult<Self> {
        Ok(Self {
            client: config.build_client()?,
        })
    }

    /// Create a resolver around an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceResolverPort for DirectUrlResolver {
    async fn resolve(&self, locator: &str) -> Result<ResolvedSource, SourceError> {
        let url = Url::parse(locator)
            .map_err(|e| HttpAdapterError::from(e).into_unavailable())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SourceError::unavailable(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }

        let mut source = ResolvedSource::new(url.as_str(), title_from_url(&url));

        match self.client.head(url.clone()).send().await {
            Ok(response) if response.status().is_success() => {
                let headers = response.headers();
                // `content_length()` on a HEAD response reports the empty body.
                let declared = headers
                    .get(CONTENT_LENGTH)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok());
                if let Some(len) = declared {
                    source = source.with_declared_len(len);
                }
                if let Some(kind) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
                    source = source.with_description(format!("Relayed {kind}"));
                }
            }
            Ok(response) => {
                let status = response.status().as_u16();
                if status == 404 || status == 410 {
                    return Err(SourceError::unavailable_with_status(
                        format!("source not found: {url}"),
                        status,
                    ));
                }
                tracing::debug!(locator, status, "HEAD rejected, length unknown");
            }
            Err(e) => {
                return Err(HttpAdapterError::from(e).into_unavailable());
            }
        }

        Ok(source)
    }
}

/// Last non-empty path segment without its extension, or the host.
fn title_from_url(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(|s| s.rsplit_once('.').map_or(s, |(stem, _)| stem))
        .filter(|s| !s.is_empty());

    segment
        .map(str::to_string)
        .or_else(|| url.host_str().map(str::to_string))
        .unwrap_or_default()
}
