// src/fetch/types.rs
use crate::fetch::FetchError;
use crate::types::{RawNewsItem, TrendingItem};

/// One class of unreliable repository source. Implementations retry
/// internally per the crate retry policy; an `Err` here means the source is
/// exhausted for this cycle and the orchestrator records an empty partial.
#[async_trait::async_trait]
pub trait RepoSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<TrendingItem>, FetchError>;
    fn name(&self) -> &'static str;
}

/// The news-feed counterpart of [`RepoSource`].
#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RawNewsItem>, FetchError>;
    fn name(&self) -> &'static str;
}
