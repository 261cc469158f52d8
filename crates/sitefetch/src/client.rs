//! Entry points for single-URL operations
//!
//! The actual fetch logic lives in [`HttpFetcher`](crate::fetchers::HttpFetcher).
//! These helpers construct one from [`FetchOptions`] and run a single call.

use crate::convert::{extract_metadata, extract_title};
use crate::error::FetchError;
use crate::fetchers::{Fetcher, HttpFetcher};
use crate::types::{iso_timestamp, FetchRequest, FetchResult, MetadataReport, SiteStatus};
use tracing::debug;

/// Default cap on response body size (10 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Timeout used by the metadata operation
pub const METADATA_TIMEOUT_MS: u64 = 15_000;

/// How non-HTML response bodies are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentPolicy {
    /// Return non-HTML bodies verbatim as raw content
    #[default]
    Permissive,
    /// Reject non-HTML bodies with `UnsupportedMediaType`
    Strict,
}

/// Executor configuration shared by every fetch of a tool
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// User-Agent used when a request does not name one
    pub user_agent: Option<String>,
    /// Handling of non-HTML bodies
    pub content_policy: ContentPolicy,
    /// Skip the private/local host check (scheme is still checked)
    pub allow_private_hosts: bool,
    /// Maximum body bytes read before truncating
    pub max_body_bytes: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: None,
            content_policy: ContentPolicy::default(),
            allow_private_hosts: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Fetch a URL with default options
///
/// For custom options, use [`fetch_with_options`].
pub async fn fetch(req: FetchRequest) -> Result<FetchResult, FetchError> {
    fetch_with_options(req, FetchOptions::default()).await
}

/// Fetch a URL with custom options
pub async fn fetch_with_options(
    req: FetchRequest,
    options: FetchOptions,
) -> Result<FetchResult, FetchError> {
    HttpFetcher::new(options).fetch(&req).await
}

/// Fetch a page and extract its metadata
///
/// The page is fetched raw with a 15 second timeout, so the body handed to
/// the extractor is the HTML as served.
pub async fn fetch_metadata(url: &str, options: FetchOptions) -> Result<MetadataReport, FetchError> {
    let fetcher = HttpFetcher::new(options);
    let request = FetchRequest::new(url).as_raw().timeout_ms(METADATA_TIMEOUT_MS);
    let result = fetcher.fetch(&request).await?;

    let metadata = extract_metadata(&result.content);
    let title = result
        .title
        .clone()
        .or_else(|| Some(extract_title(&result.content)).filter(|t| !t.is_empty()));

    debug!(
        url = %url,
        og = metadata.open_graph.len(),
        structured = metadata.structured_data.len(),
        "Metadata extracted"
    );

    Ok(MetadataReport {
        url: result.url,
        final_url: result.final_url,
        title,
        status_code: result.status_code,
        content_type: result.content_type,
        metadata,
        fetched_at: iso_timestamp(),
    })
}

/// Check a URL's availability with a HEAD request
pub async fn check_status(url: &str, options: FetchOptions) -> Result<SiteStatus, FetchError> {
    HttpFetcher::new(options).check_status(url).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let result = fetch(FetchRequest::new("")).await;
        assert!(matches!(result, Err(FetchError::InvalidFormat(_))));
    }

    #[tokio::test]
    async fn test_fetch_invalid_scheme() {
        let result = fetch(FetchRequest::new("ftp://example.com")).await;
        assert!(matches!(result, Err(FetchError::UnsupportedScheme(_))));
    }

    #[tokio::test]
    async fn test_metadata_guarded() {
        let result = fetch_metadata("http://192.168.0.10/", FetchOptions::default()).await;
        assert!(matches!(result, Err(FetchError::ForbiddenHost(_))));
    }

    #[test]
    fn test_fetch_options_default() {
        let options = FetchOptions::default();
        assert!(options.user_agent.is_none());
        assert_eq!(options.content_policy, ContentPolicy::Permissive);
        assert!(!options.allow_private_hosts);
        assert_eq!(options.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }
}
