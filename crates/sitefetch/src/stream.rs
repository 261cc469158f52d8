//! Progress streaming for batches
//!
//! A batch runs on a spawned task and reports through a bounded channel.
//! Each event becomes one server-sent-events frame:
//!
//! ```text
//! id: 3
//! event: result
//! data: {"type":"result",...}
//!
//! ```
//!
//! Dropping the [`ProgressStream`] cancels the batch.

use crate::batch::{run_batch, validate_batch, BatchEvent, BatchObserver, BatchOptions};
use crate::error::FetchError;
use crate::fetchers::Fetcher;
use crate::types::iso_timestamp;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::Serialize;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error};

/// Content type for the framed stream
pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// Frames buffered between the batch task and the consumer
const CHANNEL_CAPACITY: usize = 32;

/// One server-sent-events frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub id: Option<u64>,
    pub event: Option<String>,
    pub retry: Option<u64>,
    pub data: String,
}

impl SseFrame {
    /// Encode the frame; every data line gets its own `data: ` prefix
    pub fn encode(&self) -> String {
        let mut out = String::new();
        if let Some(id) = self.id {
            out.push_str(&format!("id: {}\n", id));
        }
        if let Some(event) = &self.event {
            out.push_str(&format!("event: {}\n", event));
        }
        if let Some(retry) = self.retry {
            out.push_str(&format!("retry: {}\n", retry));
        }
        for line in self.data.split('\n') {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out
    }
}

/// A batch event stamped with its sequence id and time
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    /// Strictly increasing, starting at 1; carried in the frame's `id:` line
    #[serde(skip)]
    pub id: u64,
    #[serde(flatten)]
    pub event: BatchEvent,
    pub timestamp: String,
}

impl ProgressEvent {
    pub fn new(id: u64, event: BatchEvent) -> Self {
        Self {
            id,
            event,
            timestamp: iso_timestamp(),
        }
    }

    /// Frame this event with its JSON payload
    pub fn to_frame(&self, retry: Option<u64>) -> Result<SseFrame, serde_json::Error> {
        Ok(SseFrame {
            id: Some(self.id),
            event: Some(self.event.name().to_string()),
            retry,
            data: serde_json::to_string(self)?,
        })
    }
}

/// Stream settings supplied by the consuming connection
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Caller-supplied session identifier echoed in the `start` event
    pub session_id: Option<String>,
    /// Reconnect hint sent on the first frame
    pub retry_ms: Option<u64>,
}

/// Framed progress of a running batch
///
/// Yields one encoded frame per event until `complete` or `error`.
pub struct ProgressStream {
    rx: mpsc::Receiver<Bytes>,
    _cancel_on_drop: DropGuard,
}

impl ProgressStream {
    /// Media type to send with the frames when forwarding over HTTP
    pub fn content_type(&self) -> &'static str {
        EVENT_STREAM_CONTENT_TYPE
    }
}

impl Stream for ProgressStream {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Start a batch on a background task and stream its progress
///
/// Input is validated up front, so an empty or oversized URL list is
/// returned as an error instead of a stream. Must be called within a
/// tokio runtime.
pub fn stream_batch<F>(
    fetcher: Arc<F>,
    urls: Vec<String>,
    options: BatchOptions,
    stream_options: StreamOptions,
) -> Result<ProgressStream, FetchError>
where
    F: Fetcher + ?Sized + 'static,
{
    validate_batch(&urls)?;

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();
    let emitter = Arc::new(Emitter {
        tx,
        next_id: AtomicU64::new(1),
        session_id: stream_options.session_id,
        retry_ms: stream_options.retry_ms,
        cancel: cancel.clone(),
    });

    let batch = {
        let emitter = emitter.clone();
        tokio::spawn(async move {
            run_batch(&*fetcher, &urls, &options, &*emitter, &emitter.cancel).await
        })
    };

    tokio::spawn(async move {
        let failure = match batch.await {
            Ok(Ok(result)) => {
                debug!(
                    successful = result.summary.successful,
                    failed = result.summary.failed,
                    "Batch stream finished"
                );
                return;
            }
            Ok(Err(FetchError::Cancelled)) => {
                debug!("Batch stream cancelled");
                return;
            }
            Ok(Err(err)) => err.to_string(),
            Err(join_err) => format!("Batch task failed: {}", join_err),
        };

        error!(error = %failure, "Batch stream failed");
        emitter.emit(BatchEvent::Error { error: failure }).await;
    });

    Ok(ProgressStream {
        rx,
        _cancel_on_drop: cancel.drop_guard(),
    })
}

/// Observer that frames events into the channel
struct Emitter {
    tx: mpsc::Sender<Bytes>,
    next_id: AtomicU64,
    session_id: Option<String>,
    retry_ms: Option<u64>,
    cancel: CancellationToken,
}

impl Emitter {
    async fn emit(&self, event: BatchEvent) {
        if self.cancel.is_cancelled() {
            return;
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let retry = if id == 1 { self.retry_ms } else { None };
        let event = match event {
            BatchEvent::Start { total_urls, .. } => BatchEvent::Start {
                total_urls,
                session_id: self.session_id.clone(),
            },
            other => other,
        };

        let frame = match ProgressEvent::new(id, event).to_frame(retry) {
            Ok(frame) => frame,
            Err(err) => {
                error!(error = %err, "Failed to encode progress event");
                self.cancel.cancel();
                error_frame(id, &err.to_string())
            }
        };

        if self.tx.send(Bytes::from(frame.encode())).await.is_err() {
            debug!("Progress consumer disconnected");
            self.cancel.cancel();
        }
    }
}

#[async_trait]
impl BatchObserver for Emitter {
    async fn on_event(&self, event: BatchEvent) {
        self.emit(event).await;
    }
}

/// Terminal frame for failures inside the emitter itself
fn error_frame(id: u64, message: &str) -> SseFrame {
    let payload = serde_json::json!({
        "type": "error",
        "error": message,
        "timestamp": iso_timestamp(),
    });
    SseFrame {
        id: Some(id),
        event: Some("error".to_string()),
        retry: None,
        data: payload.to_string(),
    }
}
