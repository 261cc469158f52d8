//! Core types for SiteFetch
//!
//! Wire names are camelCase so results serialize the way existing
//! consumers of the tool read them (`statusCode`, `finalUrl`, ...).

use chrono::{SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::FetchError;

/// Lower bound for request timeouts in milliseconds
pub const MIN_TIMEOUT_MS: u64 = 1_000;

/// Upper bound for request timeouts in milliseconds
pub const MAX_TIMEOUT_MS: u64 = 60_000;

/// Timeout used when the caller does not supply one
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Clamp a requested timeout to [`MIN_TIMEOUT_MS`, `MAX_TIMEOUT_MS`]
pub fn clamp_timeout(requested: u64) -> u64 {
    requested.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS)
}

/// Current time as ISO-8601 UTC with millisecond precision
pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Representation requested for the fetched content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Body as received
    Raw,
    /// Tags stripped, entities decoded
    Text,
    /// Structural markdown rewrite
    #[default]
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" => Ok(OutputFormat::Raw),
            "text" => Ok(OutputFormat::Text),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err("Invalid format: must be raw, text or markdown".to_string()),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Raw => write!(f, "raw"),
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// Request to fetch a URL
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    /// The URL to fetch (required, must be http:// or https://)
    pub url: String,

    /// Output format: raw, text or markdown (default markdown)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,

    /// Whether to follow HTTP redirects (default true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_redirects: Option<bool>,

    /// Timeout in milliseconds, clamped to [1000, 60000] (default 30000)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Custom User-Agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Additional headers sent with the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

impl FetchRequest {
    /// Create a new request with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the output format
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Request markdown output
    pub fn as_markdown(self) -> Self {
        self.format(OutputFormat::Markdown)
    }

    /// Request plain text output
    pub fn as_text(self) -> Self {
        self.format(OutputFormat::Text)
    }

    /// Request the raw body
    pub fn as_raw(self) -> Self {
        self.format(OutputFormat::Raw)
    }

    /// Set the redirect policy
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = Some(follow);
        self
    }

    /// Set the timeout in milliseconds (clamped when used)
    pub fn timeout_ms(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set a custom User-Agent
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Add a request header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Get the effective format (default markdown)
    pub fn effective_format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }

    /// Whether redirects are followed (default true)
    pub fn wants_redirects(&self) -> bool {
        self.follow_redirects.unwrap_or(true)
    }

    /// Effective timeout after clamping
    pub fn effective_timeout_ms(&self) -> u64 {
        clamp_timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT_MS))
    }
}

/// Result of a single fetch
///
/// A failed fetch carries `error` with an empty `content` and a zero
/// `statusCode`; see [`FetchResult::failed`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchResult {
    /// Processed content
    pub content: String,

    /// Page title (HTML responses only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// The URL that was requested
    pub url: String,

    /// URL after redirects
    pub final_url: String,

    /// Content-Type header value
    pub content_type: String,

    /// HTTP status code (0 when the fetch failed)
    pub status_code: u16,

    /// Format actually produced ("raw" for non-HTML bodies)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,

    /// Response headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Elapsed time in milliseconds
    pub fetch_time: u64,

    /// True if the body was cut at the size limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,

    /// Error message (failed fetches only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchResult {
    /// Build the result slot for a fetch that failed after `fetch_time` ms
    pub fn failed(url: impl Into<String>, error: &FetchError, fetch_time: u64) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            fetch_time,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    /// Status code in [200, 400)
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status_code)
    }
}

/// Metadata extracted from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robots: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    /// `og:*` properties
    #[serde(default)]
    pub open_graph: BTreeMap<String, String>,
    /// `twitter:*` properties
    #[serde(default)]
    pub twitter_card: BTreeMap<String, String>,
    /// Parsed JSON-LD blocks in document order
    #[serde(default)]
    pub structured_data: Vec<serde_json::Value>,
}

/// Report produced by the metadata operation
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetadataReport {
    pub url: String,
    pub final_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status_code: u16,
    pub content_type: String,
    pub metadata: PageMetadata,
    pub fetched_at: String,
}

/// Report produced by the status check (HEAD) operation
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SiteStatus {
    pub url: String,
    pub final_url: String,
    pub status_code: u16,
    pub status_text: String,
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    pub last_modified: Option<String>,
    pub server: Option<String>,
    /// True iff the status is 2xx
    pub accessible: bool,
    pub checked_at: String,
}

/// Arguments for operations that take only a URL
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UrlArgs {
    /// The URL to inspect (must be http:// or https://)
    pub url: String,
}

/// Success/failure envelope returned across the adapter boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub timestamp: String,
}

impl<T> From<Result<T, FetchError>> for ToolResponse<T> {
    fn from(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
                code: None,
                timestamp: iso_timestamp(),
            },
            Err(err) => Self {
                success: false,
                data: None,
                error: Some(err.to_string()),
                code: Some(err.code().to_string()),
                timestamp: iso_timestamp(),
            },
        }
    }
}
