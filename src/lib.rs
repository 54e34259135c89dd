// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregator;
pub mod api;
pub mod cache;
pub mod config;
pub mod enrich;
pub mod fetch;
pub mod metrics;
pub mod notify;
pub mod rank;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::{Aggregate, Aggregator};
pub use crate::api::{create_router, AppState};
pub use crate::cache::{CacheStatus, ContentCache, Disposition, Served};
pub use crate::config::AppConfig;
pub use crate::types::{ContentSnapshot, NewsItem, RawNewsItem, TrendingItem};
