//! SiteFetch - guarded web fetching for LLM tools
//!
//! This crate fetches remote pages on behalf of a caller, refuses targets in
//! local or private network space, and converts HTML into raw, plain text or
//! markdown output. Lists of URLs are fetched in bounded chunks, either
//! collected into a [`BatchResult`] or streamed as framed progress events.
//!
//! ## Components
//!
//! - [`guard`] - URL scheme and host validation, no I/O
//! - [`convert`] - title, text, markdown and metadata extraction, no I/O
//! - [`HttpFetcher`] - one guarded HTTP retrieval with timeout and redirects
//! - [`batch`] - chunked fan-out with per-URL failure isolation
//! - [`stream`] - server-sent-events framing of batch progress
//!
//! [`Tool`] bundles a configured fetcher and exposes the operations by name.

pub mod batch;
pub mod client;
pub mod convert;
mod error;
pub mod fetchers;
pub mod guard;
pub mod stream;
mod tool;
mod types;

pub use batch::{
    fetch_batch, run_batch, BatchArgs, BatchEvent, BatchItem, BatchObserver, BatchOptions,
    BatchResult, BatchSummary,
};
pub use client::{
    check_status, fetch, fetch_metadata, fetch_with_options, ContentPolicy, FetchOptions,
};
pub use convert::{extract_metadata, extract_title, html_to_markdown, html_to_text};
pub use error::{CallError, FetchError};
pub use fetchers::{Fetcher, HttpFetcher};
pub use guard::validate_url;
pub use stream::{stream_batch, ProgressEvent, ProgressStream, SseFrame, StreamOptions};
pub use tool::{Operation, Tool, ToolBuilder, ToolDescriptor};
pub use types::{
    clamp_timeout, FetchRequest, FetchResult, MetadataReport, OutputFormat, PageMetadata,
    SiteStatus, ToolResponse, UrlArgs,
};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; SiteFetch/1.0)";

/// Tool description for LLM consumption
pub const TOOL_DESCRIPTION: &str = r#"Fetches a web page and returns its content as markdown, plain text or raw HTML.

- Refuses localhost and private network addresses
- Follows redirects unless disabled
- Returns non-HTML bodies unchanged
- Timeout between 1 and 60 seconds"#;

/// Extended documentation for LLM consumption (llmtxt)
pub const TOOL_LLMTXT: &str = r#"# SiteFetch Tool

Fetches web pages and converts HTML to markdown or plain text.

## Operations
- `fetchWebsite`: fetch one URL
- `fetchMultipleWebsites`: fetch up to 20 URLs with bounded concurrency
- `extractWebsiteMetadata`: title, description, Open Graph, Twitter card, JSON-LD
- `checkWebsiteStatus`: HEAD request reporting status and key headers

## fetchWebsite Parameters
- `url` (required): The URL to fetch (must be http:// or https://)
- `format` (optional): "markdown" (default), "text" or "raw"
- `followRedirects` (optional): Follow redirects (default: true)
- `timeout` (optional): Milliseconds, clamped to [1000, 60000] (default: 30000)
- `userAgent` (optional): Custom User-Agent
- `headers` (optional): Additional request headers

## fetchMultipleWebsites Parameters
- `urls` (required): 1 to 20 URLs
- `format`, `followRedirects`, `timeout`: as above, shared by every URL
- `maxConcurrency` (optional): URLs fetched at once, clamped to [1, 10] (default: 5)

## fetchWebsite Output Fields
- `content`: The fetched/converted content
- `title`: Page title (HTML only)
- `url`: The requested URL
- `finalUrl`: URL after redirects
- `contentType`: Content-Type header value
- `statusCode`: HTTP status code
- `format`: "markdown", "text" or "raw"
- `headers`: Response headers
- `fetchTime`: Elapsed milliseconds
- `truncated`: True if the body hit the size limit

## Examples

### Fetch a webpage as markdown
```json
{"url": "https://example.com"}
```

### Fetch several pages as text
```json
{"urls": ["https://example.com", "https://example.org"], "format": "text", "maxConcurrency": 2}
```

### Check if a URL is up
```json
{"url": "https://example.com/file.pdf"}
```

## Error Handling
- Localhost, private addresses and non-HTTP schemes are rejected before any request
- HTTP status 400 and above is an error for fetches, a reported status for status checks
- Batch failures are reported per URL and never abort the batch
"#;
