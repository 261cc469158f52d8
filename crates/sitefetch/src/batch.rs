//! Batch orchestration
//!
//! Fetches a list of URLs in consecutive chunks. Every fetch of a chunk runs
//! concurrently and the next chunk starts only after the whole chunk has
//! finished. Per-URL failures are folded into that URL's result slot.

use crate::client::FetchOptions;
use crate::error::FetchError;
use crate::fetchers::{Fetcher, HttpFetcher};
use crate::types::{FetchRequest, FetchResult, OutputFormat};
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Maximum URLs accepted by one batch
pub const MAX_BATCH_URLS: usize = 20;

/// Concurrency used when the caller does not supply one
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Lower bound for the concurrency window
pub const MIN_CONCURRENCY: usize = 1;

/// Upper bound for the concurrency window
pub const MAX_CONCURRENCY: usize = 10;

/// Clamp a requested concurrency to [`MIN_CONCURRENCY`, `MAX_CONCURRENCY`]
pub fn clamp_concurrency(requested: usize) -> usize {
    requested.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
}

/// Reject batch input before any fetching starts
pub fn validate_batch(urls: &[String]) -> Result<(), FetchError> {
    if urls.is_empty() {
        return Err(FetchError::EmptyBatch);
    }
    if urls.len() > MAX_BATCH_URLS {
        return Err(FetchError::BatchTooLarge(urls.len()));
    }
    Ok(())
}

/// Options shared by every URL of a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchOptions {
    /// Output format: raw, text or markdown (default: markdown)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,

    /// Follow redirects (default: true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_redirects: Option<bool>,

    /// Per-request timeout in milliseconds, clamped to [1000, 60000]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// URLs fetched at once, clamped to [1, 10] (default: 5)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
}

impl BatchOptions {
    /// Effective chunk size
    pub fn concurrency(&self) -> usize {
        clamp_concurrency(self.max_concurrency.unwrap_or(DEFAULT_CONCURRENCY))
    }

    /// Build the request for one URL of the batch
    pub fn request_for(&self, url: &str) -> FetchRequest {
        FetchRequest {
            url: url.to_string(),
            format: self.format,
            follow_redirects: self.follow_redirects,
            timeout: self.timeout,
            ..Default::default()
        }
    }
}

/// Arguments of a batch call: the URL list plus shared options
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchArgs {
    /// URLs to fetch (1 to 20)
    pub urls: Vec<String>,

    #[serde(flatten)]
    pub options: BatchOptions,
}

/// One URL's outcome inside a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchItem {
    /// Status code in [200, 400)
    pub success: bool,

    #[serde(flatten)]
    pub result: FetchResult,
}

impl From<FetchResult> for BatchItem {
    fn from(result: FetchResult) -> Self {
        Self {
            success: result.is_success(),
            result,
        }
    }
}

/// Success/failure counts of a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total_requested: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Results aligned by index with the input URLs, plus a summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchResult {
    pub results: Vec<BatchItem>,
    pub summary: BatchSummary,
}

impl BatchResult {
    fn from_items(results: Vec<BatchItem>) -> Self {
        let successful = results.iter().filter(|item| item.success).count();
        let summary = BatchSummary {
            total_requested: results.len(),
            successful,
            failed: results.len() - successful,
        };
        Self { results, summary }
    }
}

/// Progress reported while a batch runs
///
/// Serialized with a `type` tag (`start`, `batch_start`, `result`,
/// `batch_complete`, `complete`, `error`) and camelCase fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    #[serde(rename_all = "camelCase")]
    Start {
        total_urls: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    #[serde(rename = "batch_start", rename_all = "camelCase")]
    ChunkStart { batch_index: usize, urls: Vec<String> },
    #[serde(rename_all = "camelCase")]
    Result {
        url: String,
        index: usize,
        completed: usize,
        total: usize,
        success: bool,
        data: Option<FetchResult>,
        error: Option<String>,
    },
    #[serde(rename = "batch_complete", rename_all = "camelCase")]
    ChunkComplete {
        batch_index: usize,
        completed: usize,
        total: usize,
    },
    #[serde(rename_all = "camelCase")]
    Complete {
        total_completed: usize,
        total_requested: usize,
    },
    Error { error: String },
}

impl BatchEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            BatchEvent::Start { .. } => "start",
            BatchEvent::ChunkStart { .. } => "batch_start",
            BatchEvent::Result { .. } => "result",
            BatchEvent::ChunkComplete { .. } => "batch_complete",
            BatchEvent::Complete { .. } => "complete",
            BatchEvent::Error { .. } => "error",
        }
    }
}

/// Receives progress events from [`run_batch`]
///
/// Events are delivered one at a time in the order they happen; the
/// orchestrator awaits each call before continuing.
#[async_trait]
pub trait BatchObserver: Send + Sync {
    async fn on_event(&self, event: BatchEvent);
}

/// Observer that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

#[async_trait]
impl BatchObserver for NoopObserver {
    async fn on_event(&self, _event: BatchEvent) {}
}

/// Fetch a list of URLs over HTTP with the given options
pub async fn fetch_batch(
    urls: &[String],
    options: &BatchOptions,
    fetch_options: FetchOptions,
) -> Result<BatchResult, FetchError> {
    let fetcher = HttpFetcher::new(fetch_options);
    run_batch(&fetcher, urls, options, &NoopObserver, &CancellationToken::new()).await
}

/// Run a batch with an injected fetcher and observer
///
/// Fails with `EmptyBatch`/`BatchTooLarge` before any fetch, and with
/// `Cancelled` when `cancel` fires; in-flight fetches of the current chunk
/// are dropped and later chunks never start. Every other failure lands in
/// the URL's result slot.
pub async fn run_batch<F, O>(
    fetcher: &F,
    urls: &[String],
    options: &BatchOptions,
    observer: &O,
    cancel: &CancellationToken,
) -> Result<BatchResult, FetchError>
where
    F: Fetcher + ?Sized,
    O: BatchObserver + ?Sized,
{
    validate_batch(urls)?;

    let total = urls.len();
    let chunk_size = options.concurrency();
    let mut slots: Vec<Option<BatchItem>> = vec![None; total];
    let mut completed = 0;

    observer
        .on_event(BatchEvent::Start {
            total_urls: total,
            session_id: None,
        })
        .await;

    for (chunk, urls_in_chunk) in urls.chunks(chunk_size).enumerate() {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let offset = chunk * chunk_size;
        debug!(chunk, size = urls_in_chunk.len(), fetcher = fetcher.name(), "Starting chunk");
        observer
            .on_event(BatchEvent::ChunkStart {
                batch_index: chunk,
                urls: urls_in_chunk.to_vec(),
            })
            .await;

        let mut pending: FuturesUnordered<_> = urls_in_chunk
            .iter()
            .enumerate()
            .map(|(i, url)| {
                let request = options.request_for(url);
                async move {
                    let started = Instant::now();
                    let outcome = fetcher.fetch(&request).await;
                    let elapsed = started.elapsed().as_millis() as u64;
                    (offset + i, request.url, outcome, elapsed)
                }
            })
            .collect();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(chunk, "Batch cancelled");
                    return Err(FetchError::Cancelled);
                }
                next = pending.next() => next,
            };
            let Some((index, url, outcome, elapsed)) = next else {
                break;
            };

            completed += 1;
            let result = match outcome {
                Ok(result) => result,
                Err(err) => {
                    warn!(url = %url, error = %err, "Batch fetch failed");
                    FetchResult::failed(&url, &err, elapsed)
                }
            };
            let item = BatchItem::from(result);

            observer
                .on_event(BatchEvent::Result {
                    url,
                    index,
                    completed,
                    total,
                    success: item.success,
                    data: item.result.error.is_none().then(|| item.result.clone()),
                    error: item.result.error.clone(),
                })
                .await;

            slots[index] = Some(item);
        }

        observer
            .on_event(BatchEvent::ChunkComplete {
                batch_index: chunk,
                completed,
                total,
            })
            .await;
    }

    observer
        .on_event(BatchEvent::Complete {
            total_completed: completed,
            total_requested: total,
        })
        .await;

    Ok(BatchResult::from_items(slots.into_iter().flatten().collect()))
}
