//! Fetcher system
//!
//! Design: a [`Fetcher`] performs one retrieval for a [`FetchRequest`].
//! The batch orchestrator and the progress stream are generic over this
//! trait, so callers inject the fetcher they want instead of looking one up.

mod http;

pub use http::HttpFetcher;

use crate::error::FetchError;
use crate::types::{FetchRequest, FetchResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for content fetchers
///
/// Implementations must be safe to call concurrently: the batch
/// orchestrator runs one call per URL of a chunk at the same time.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Unique identifier for this fetcher (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Fetch content for the request
    ///
    /// Returns a [`FetchResult`] on success or a [`FetchError`] describing
    /// why the retrieval failed. Implementations do not retry.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        (**self).fetch(request).await
    }
}
