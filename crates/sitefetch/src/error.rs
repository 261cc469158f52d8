//! Error types for SiteFetch

use thiserror::Error;

/// Errors that can occur during fetch operations
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL could not be parsed
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    /// URL scheme is not http or https
    #[error("Unsupported protocol: {0}. Only HTTP and HTTPS are allowed.")]
    UnsupportedScheme(String),

    /// Host resolves to local or private network space
    #[error("Forbidden host: {0}. Private IP addresses and localhost are not allowed")]
    ForbiddenHost(String),

    /// Caller supplied a header that is not a legal HTTP header
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Request was cancelled because the timeout elapsed
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Connection, TLS, redirect or body transfer failure
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Upstream answered with a status >= 400
    #[error("HTTP {status}: {status_text}")]
    HttpStatus { status: u16, status_text: String },

    /// Non-HTML content under the strict content policy
    #[error("Unsupported content type: {0}. Only HTML content is supported.")]
    UnsupportedMediaType(String),

    /// Batch called with no URLs
    #[error("No URLs provided")]
    EmptyBatch,

    /// Batch called with more URLs than allowed
    #[error("Too many URLs: {0}. Maximum {max} URLs allowed per request.", max = crate::batch::MAX_BATCH_URLS)]
    BatchTooLarge(usize),

    /// Batch stopped by an external cancellation signal
    #[error("Operation cancelled")]
    Cancelled,
}

impl FetchError {
    /// Create an error from a reqwest error
    ///
    /// `timeout_ms` is the effective timeout of the request, reported back
    /// when reqwest itself gave up on time.
    pub fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if let Some(rejected) = rejected_redirect(&err) {
            rejected
        } else if err.is_timeout() {
            FetchError::Timeout(timeout_ms)
        } else {
            FetchError::NetworkError(err.to_string())
        }
    }

    /// Stable machine-readable code for structured failure descriptions
    pub fn code(&self) -> &'static str {
        match self {
            FetchError::InvalidFormat(_) => "INVALID_FORMAT",
            FetchError::UnsupportedScheme(_) => "UNSUPPORTED_SCHEME",
            FetchError::ForbiddenHost(_) => "FORBIDDEN_HOST",
            FetchError::InvalidHeader(_) => "INVALID_HEADER",
            FetchError::ClientBuildError(_) => "CLIENT_BUILD_ERROR",
            FetchError::Timeout(_) => "TIMEOUT",
            FetchError::NetworkError(_) => "NETWORK_ERROR",
            FetchError::HttpStatus { .. } => "HTTP_STATUS_ERROR",
            FetchError::UnsupportedMediaType(_) => "UNSUPPORTED_MEDIA_TYPE",
            FetchError::EmptyBatch => "EMPTY_BATCH",
            FetchError::BatchTooLarge(_) => "BATCH_TOO_LARGE",
            FetchError::Cancelled => "CANCELLED",
        }
    }

    /// True for errors raised by the URL guard before any network activity
    pub fn is_guard_rejection(&self) -> bool {
        matches!(
            self,
            FetchError::InvalidFormat(_)
                | FetchError::UnsupportedScheme(_)
                | FetchError::ForbiddenHost(_)
        )
    }
}

/// Guard rejection carried as the source of a refused redirect
fn rejected_redirect(err: &reqwest::Error) -> Option<FetchError> {
    if !err.is_redirect() {
        return None;
    }
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if let Some(FetchError::ForbiddenHost(host)) = inner.downcast_ref::<FetchError>() {
            return Some(FetchError::ForbiddenHost(host.clone()));
        }
        source = inner.source();
    }
    None
}

/// Errors raised when dispatching a tool call by name
#[derive(Debug, Error)]
pub enum CallError {
    /// No operation with this name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments did not match the operation's input schema
    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),
}
