//! HTTP fetcher
//!
//! Performs a single guarded GET (or HEAD for status checks) with a
//! cancelling timeout, optional redirect following and HTML conversion.

use crate::client::{ContentPolicy, FetchOptions};
use crate::convert::{
    extract_title, html_to_markdown_with, html_to_text, is_html_content_type, looks_like_html,
    MarkdownOptions,
};
use crate::error::FetchError;
use crate::fetchers::Fetcher;
use crate::guard::{check_host, validate_scheme, validate_url};
use crate::types::{
    clamp_timeout, iso_timestamp, FetchRequest, FetchResult, OutputFormat, SiteStatus,
    DEFAULT_TIMEOUT_MS,
};
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_LENGTH,
    CONTENT_TYPE, LAST_MODIFIED, PRAGMA, SERVER, USER_AGENT,
};
use reqwest::redirect::Policy;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// Accept header sent with every GET
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Accept-Language header sent with every request
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.5";

/// Redirect hops followed before giving up
const MAX_REDIRECTS: usize = 10;

/// HTTP fetcher
///
/// Handles all HTTP/HTTPS URLs with:
/// - URL guard before the request and on every redirect hop
/// - Timeout that cancels the in-flight request
/// - HTML to markdown/text conversion
/// - Strict or permissive handling of non-HTML bodies
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    options: FetchOptions,
}

impl HttpFetcher {
    /// Create a new HTTP fetcher with the given options
    pub fn new(options: FetchOptions) -> Self {
        Self { options }
    }

    /// Options this fetcher was built with
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Check a URL with a HEAD request
    ///
    /// Redirects are followed and the content is never downloaded or
    /// converted. Any HTTP status is reported, not raised.
    pub async fn check_status(&self, url: &str) -> Result<SiteStatus, FetchError> {
        let parsed = self.guard(url)?;
        let timeout_ms = clamp_timeout(DEFAULT_TIMEOUT_MS);

        with_timeout(timeout_ms, async {
            let client = self.client(default_headers(self.user_agent(None))?, true)?;
            let response = client
                .head(parsed)
                .send()
                .await
                .map_err(|e| FetchError::from_reqwest(e, timeout_ms))?;

            let status = response.status();
            let headers = response.headers();
            debug!(url = %url, status = status.as_u16(), "Status check complete");

            Ok(SiteStatus {
                url: url.to_string(),
                final_url: response.url().to_string(),
                status_code: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                content_type: header_string(headers, &CONTENT_TYPE),
                content_length: header_string(headers, &CONTENT_LENGTH),
                last_modified: header_string(headers, &LAST_MODIFIED),
                server: header_string(headers, &SERVER),
                accessible: status.is_success(),
                checked_at: iso_timestamp(),
            })
        })
        .await
    }

    /// Run the URL guard, honoring `allow_private_hosts`
    fn guard(&self, url: &str) -> Result<Url, FetchError> {
        if self.options.allow_private_hosts {
            validate_scheme(url)
        } else {
            validate_url(url)
        }
    }

    fn user_agent<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .or(self.options.user_agent.as_deref())
            .unwrap_or(DEFAULT_USER_AGENT)
    }

    fn client(&self, headers: HeaderMap, follow_redirects: bool) -> Result<reqwest::Client, FetchError> {
        let policy = match (follow_redirects, self.options.allow_private_hosts) {
            (false, _) => Policy::none(),
            (true, false) => redirect_policy(check_host),
            (true, true) => redirect_policy(|_| Ok(())),
        };

        reqwest::Client::builder()
            .default_headers(headers)
            .redirect(policy)
            .build()
            .map_err(FetchError::ClientBuildError)
    }

    async fn fetch_inner(
        &self,
        request: &FetchRequest,
        url: Url,
        timeout_ms: u64,
        started: Instant,
    ) -> Result<FetchResult, FetchError> {
        let mut headers = default_headers(self.user_agent(request.user_agent.as_deref()))?;
        if let Some(extra) = &request.headers {
            apply_headers(&mut headers, extra)?;
        }

        let client = self.client(headers, request.wants_redirects())?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, timeout_ms))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let final_url = response.url().clone();
        let resp_headers = header_map(response.headers());
        let content_type = header_string(response.headers(), &CONTENT_TYPE);

        // Strict mode can refuse before downloading the body
        if self.options.content_policy == ContentPolicy::Strict {
            if let Some(ct) = content_type.as_deref().filter(|ct| !is_html_content_type(ct)) {
                return Err(FetchError::UnsupportedMediaType(ct.to_string()));
            }
        }

        let (body, truncated) = read_body(response, self.options.max_body_bytes).await?;
        let body = String::from_utf8_lossy(&body).into_owned();

        let is_html = match content_type.as_deref() {
            Some(ct) => is_html_content_type(ct),
            None => looks_like_html(&body),
        };

        let (format, content, title) = if is_html {
            let title = extract_title(&body);
            let content = match request.effective_format() {
                OutputFormat::Raw => body,
                OutputFormat::Text => html_to_text(&body),
                OutputFormat::Markdown => {
                    let options = MarkdownOptions {
                        base_url: Some(final_url.clone()),
                        ..Default::default()
                    };
                    html_to_markdown_with(&body, &options)
                }
            };
            let title = (!title.is_empty()).then_some(title);
            (request.effective_format(), content, title)
        } else {
            match self.options.content_policy {
                ContentPolicy::Strict => {
                    return Err(FetchError::UnsupportedMediaType(
                        content_type.unwrap_or_else(|| "(none)".to_string()),
                    ));
                }
                ContentPolicy::Permissive => (OutputFormat::Raw, body, None),
            }
        };

        let fetch_time = started.elapsed().as_millis() as u64;
        debug!(
            url = %request.url,
            status = status.as_u16(),
            format = %format,
            elapsed_ms = fetch_time,
            "Fetch complete"
        );

        Ok(FetchResult {
            content,
            title,
            url: request.url.clone(),
            final_url: final_url.to_string(),
            content_type: content_type.unwrap_or_default(),
            status_code: status.as_u16(),
            format: Some(format),
            headers: resp_headers,
            fetch_time,
            truncated: truncated.then_some(true),
            error: None,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        let url = self.guard(&request.url)?;
        let timeout_ms = request.effective_timeout_ms();
        let started = Instant::now();

        with_timeout(timeout_ms, self.fetch_inner(request, url, timeout_ms, started)).await
    }
}

/// Follow up to [`MAX_REDIRECTS`] hops, checking every hop before it is sent
///
/// A rejected hop aborts the request with the guard's error as the source,
/// which [`FetchError::from_reqwest`] surfaces again.
fn redirect_policy<F>(check: F) -> Policy
where
    F: Fn(&Url) -> Result<(), FetchError> + Send + Sync + 'static,
{
    Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        match check(attempt.url()) {
            Ok(()) => attempt.follow(),
            Err(err) => {
                warn!(url = %attempt.url(), error = %err, "Redirect hop rejected");
                attempt.error(err)
            }
        }
    })
}

/// Run a request future, cancelling it when the timeout elapses
async fn with_timeout<T>(
    timeout_ms: u64,
    fut: impl Future<Output = Result<T, FetchError>>,
) -> Result<T, FetchError> {
    match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_ms, "Request cancelled after timeout");
            Err(FetchError::Timeout(timeout_ms))
        }
    }
}

/// Build the default header set
fn default_headers(user_agent: &str) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .map_err(|_| FetchError::InvalidHeader(format!("User-Agent: {}", user_agent)))?,
    );
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    Ok(headers)
}

/// Overlay caller-supplied headers on the defaults
fn apply_headers(headers: &mut HeaderMap, extra: &BTreeMap<String, String>) -> Result<(), FetchError> {
    for (name, value) in extra {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| FetchError::InvalidHeader(name.clone()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| FetchError::InvalidHeader(name.clone()))?;
        headers.insert(header_name, header_value);
    }
    Ok(())
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Flatten response headers, joining repeated names with ", "
fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    map
}

/// Read the response body up to `max_bytes`, flagging truncation
async fn read_body(response: reqwest::Response, max_bytes: usize) -> Result<(Bytes, bool), FetchError> {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let bytes = chunk.map_err(|e| FetchError::NetworkError(e.to_string()))?;
        let remaining = max_bytes.saturating_sub(body.len());
        if bytes.len() > remaining {
            body.extend_from_slice(&bytes[..remaining]);
            warn!(max_bytes, "Body size limit reached, truncating content");
            return Ok((Bytes::from(body), true));
        }
        body.extend_from_slice(&bytes);
    }

    Ok((Bytes::from(body), false))
}
