//! Tool builder and contract for SiteFetch
//!
//! A [`Tool`] is the configured entry point adapters receive at startup.
//! It exposes the four operations by name with their input schemas, so a
//! routing layer can list and dispatch them without a global registry.

use crate::batch::{run_batch, BatchArgs, BatchResult, NoopObserver};
use crate::client::{fetch_metadata, ContentPolicy, FetchOptions, DEFAULT_MAX_BODY_BYTES};
use crate::error::{CallError, FetchError};
use crate::fetchers::{Fetcher, HttpFetcher};
use crate::stream::{stream_batch, ProgressStream, StreamOptions};
use crate::types::{FetchRequest, FetchResult, MetadataReport, SiteStatus, ToolResponse, UrlArgs};
use crate::{TOOL_DESCRIPTION, TOOL_LLMTXT};
use schemars::schema_for;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Operations exposed by the tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    FetchWebsite,
    FetchMultipleWebsites,
    ExtractWebsiteMetadata,
    CheckWebsiteStatus,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::FetchWebsite,
        Operation::FetchMultipleWebsites,
        Operation::ExtractWebsiteMetadata,
        Operation::CheckWebsiteStatus,
    ];

    /// Name used to list and call the operation
    pub fn name(self) -> &'static str {
        match self {
            Operation::FetchWebsite => "fetchWebsite",
            Operation::FetchMultipleWebsites => "fetchMultipleWebsites",
            Operation::ExtractWebsiteMetadata => "extractWebsiteMetadata",
            Operation::CheckWebsiteStatus => "checkWebsiteStatus",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Operation::FetchWebsite => TOOL_DESCRIPTION,
            Operation::FetchMultipleWebsites => {
                "Fetch up to 20 URLs with bounded concurrency. Failures are reported per URL \
                 and summarized; they never abort the batch."
            }
            Operation::ExtractWebsiteMetadata => {
                "Extract title, description, keywords, Open Graph, Twitter card and JSON-LD \
                 metadata from a web page."
            }
            Operation::CheckWebsiteStatus => {
                "Check whether a URL is reachable with a HEAD request. Reports status and \
                 key headers without downloading the body."
            }
        }
    }

    /// JSON schema of the operation's arguments
    pub fn input_schema(self) -> serde_json::Value {
        let schema = match self {
            Operation::FetchWebsite => schema_for!(FetchRequest),
            Operation::FetchMultipleWebsites => schema_for!(BatchArgs),
            Operation::ExtractWebsiteMetadata | Operation::CheckWebsiteStatus => {
                schema_for!(UrlArgs)
            }
        };
        serde_json::to_value(schema).unwrap_or_default()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

/// Listing entry for one operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

impl From<Operation> for ToolDescriptor {
    fn from(op: Operation) -> Self {
        Self {
            name: op.name().to_string(),
            description: op.description().to_string(),
            input_schema: op.input_schema(),
        }
    }
}

/// Builder for configuring the SiteFetch tool
#[derive(Debug, Clone)]
pub struct ToolBuilder {
    user_agent: Option<String>,
    content_policy: ContentPolicy,
    allow_private_hosts: bool,
    max_body_bytes: usize,
}

impl Default for ToolBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            content_policy: ContentPolicy::default(),
            allow_private_hosts: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ToolBuilder {
    /// Create a new tool builder with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom User-Agent
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Reject non-HTML responses instead of returning them raw
    pub fn strict(mut self, strict: bool) -> Self {
        self.content_policy = if strict {
            ContentPolicy::Strict
        } else {
            ContentPolicy::Permissive
        };
        self
    }

    /// Allow loopback and private hosts (local deployments and tests)
    pub fn allow_private_hosts(mut self, allow: bool) -> Self {
        self.allow_private_hosts = allow;
        self
    }

    /// Cap on response body size
    pub fn max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    /// Build the tool
    pub fn build(self) -> Tool {
        let options = FetchOptions {
            user_agent: self.user_agent,
            content_policy: self.content_policy,
            allow_private_hosts: self.allow_private_hosts,
            max_body_bytes: self.max_body_bytes,
        };
        Tool {
            fetcher: Arc::new(HttpFetcher::new(options.clone())),
            options,
        }
    }
}

/// Configured SiteFetch tool
#[derive(Debug, Clone)]
pub struct Tool {
    options: FetchOptions,
    fetcher: Arc<HttpFetcher>,
}

impl Default for Tool {
    fn default() -> Self {
        ToolBuilder::new().build()
    }
}

impl Tool {
    /// Create a new tool builder
    pub fn builder() -> ToolBuilder {
        ToolBuilder::new()
    }

    /// Options this tool was built with
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Get tool description
    pub fn description(&self) -> &'static str {
        TOOL_DESCRIPTION
    }

    /// Get full documentation (llmtxt)
    pub fn llmtxt(&self) -> &'static str {
        TOOL_LLMTXT
    }

    /// Listing of every operation with its input schema
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        Operation::ALL.into_iter().map(ToolDescriptor::from).collect()
    }

    /// Fetch a single URL
    pub async fn fetch_website(&self, req: FetchRequest) -> Result<FetchResult, FetchError> {
        self.fetcher.fetch(&req).await
    }

    /// Fetch up to 20 URLs and summarize the outcome
    pub async fn fetch_multiple_websites(&self, args: BatchArgs) -> Result<BatchResult, FetchError> {
        run_batch(
            &*self.fetcher,
            &args.urls,
            &args.options,
            &NoopObserver,
            &CancellationToken::new(),
        )
        .await
    }

    /// Fetch a page and extract its metadata
    pub async fn extract_website_metadata(&self, url: &str) -> Result<MetadataReport, FetchError> {
        fetch_metadata(url, self.options.clone()).await
    }

    /// HEAD a URL and report its status
    pub async fn check_website_status(&self, url: &str) -> Result<SiteStatus, FetchError> {
        self.fetcher.check_status(url).await
    }

    /// Run a batch in the background and stream its progress frames
    pub fn stream_batch(
        &self,
        args: BatchArgs,
        stream_options: StreamOptions,
    ) -> Result<ProgressStream, FetchError> {
        stream_batch(self.fetcher.clone(), args.urls, args.options, stream_options)
    }

    /// Dispatch an operation by name
    ///
    /// Returns the operation's [`ToolResponse`] envelope as JSON. Operation
    /// failures are reported inside the envelope; only an unknown name or
    /// malformed arguments fail the call itself.
    pub async fn call(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, CallError> {
        let op = Operation::from_name(name).ok_or_else(|| CallError::UnknownTool(name.to_string()))?;
        debug!(operation = op.name(), "Dispatching tool call");

        let value = match op {
            Operation::FetchWebsite => {
                let req: FetchRequest = serde_json::from_value(arguments)?;
                envelope(self.fetch_website(req).await)?
            }
            Operation::FetchMultipleWebsites => {
                let args: BatchArgs = serde_json::from_value(arguments)?;
                envelope(self.fetch_multiple_websites(args).await)?
            }
            Operation::ExtractWebsiteMetadata => {
                let args: UrlArgs = serde_json::from_value(arguments)?;
                envelope(self.extract_website_metadata(&args.url).await)?
            }
            Operation::CheckWebsiteStatus => {
                let args: UrlArgs = serde_json::from_value(arguments)?;
                envelope(self.check_website_status(&args.url).await)?
            }
        };
        Ok(value)
    }
}

fn envelope<T: Serialize>(result: Result<T, FetchError>) -> Result<serde_json::Value, CallError> {
    Ok(serde_json::to_value(ToolResponse::from(result))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_builder() {
        let tool = Tool::builder()
            .user_agent("TestAgent/1.0")
            .strict(true)
            .allow_private_hosts(true)
            .max_body_bytes(1024)
            .build();

        let options = tool.options();
        assert_eq!(options.user_agent.as_deref(), Some("TestAgent/1.0"));
        assert_eq!(options.content_policy, ContentPolicy::Strict);
        assert!(options.allow_private_hosts);
        assert_eq!(options.max_body_bytes, 1024);
    }

    #[test]
    fn test_tool_description() {
        let tool = Tool::default();
        assert!(!tool.description().is_empty());
        assert!(!tool.llmtxt().is_empty());
        assert_eq!(tool.options().content_policy, ContentPolicy::Permissive);
    }

    #[test]
    fn test_descriptors() {
        let names: Vec<String> = Tool::default()
            .descriptors()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "fetchWebsite",
                "fetchMultipleWebsites",
                "extractWebsiteMetadata",
                "checkWebsiteStatus"
            ]
        );
    }

    #[test]
    fn test_input_schemas() {
        let fetch = Operation::FetchWebsite.input_schema();
        assert!(fetch["properties"]["url"].is_object());
        assert!(fetch["properties"]["followRedirects"].is_object());

        let batch = Operation::FetchMultipleWebsites.input_schema();
        assert!(batch["properties"]["urls"].is_object());
        assert!(batch["properties"]["maxConcurrency"].is_object());

        let status = Operation::CheckWebsiteStatus.input_schema();
        assert!(status["properties"]["url"].is_object());
    }

    #[test]
    fn test_operation_from_name() {
        assert_eq!(
            Operation::from_name("checkWebsiteStatus"),
            Some(Operation::CheckWebsiteStatus)
        );
        assert_eq!(Operation::from_name("fetchPage"), None);
    }

    #[tokio::test]
    async fn test_call_unknown_tool() {
        let result = Tool::default().call("nope", serde_json::json!({})).await;
        assert!(matches!(result, Err(CallError::UnknownTool(_))));
    }

    #[tokio::test]
    async fn test_call_invalid_arguments() {
        let result = Tool::default()
            .call("fetchWebsite", serde_json::json!({"format": "markdown"}))
            .await;
        assert!(matches!(result, Err(CallError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn test_call_reports_failure_in_envelope() {
        let value = Tool::default()
            .call(
                "fetchMultipleWebsites",
                serde_json::json!({"urls": []}),
            )
            .await
            .unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "No URLs provided");
        assert_eq!(value["code"], "EMPTY_BATCH");
    }

    #[tokio::test]
    async fn test_stream_batch_validates_input() {
        let args = BatchArgs::default();
        let result = Tool::default().stream_batch(args, StreamOptions::default());
        assert!(matches!(result, Err(FetchError::EmptyBatch)));
    }
}
