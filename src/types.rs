// src/types.rs
// Domain model shared across fetchers, enrichment, aggregation, and the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One externally observed popular repository.
///
/// `repo_url` is the canonical identity: any merged collection holds at most
/// one item per URL. Star/fork counts come from heterogeneous sources and may
/// be mutually stale for the same repo; the merge keeps the first-seen value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingItem {
    pub title: String,
    pub repo_url: String,
    pub stars: u64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Today's star delta. Only the trending-page source can observe this;
    /// search-derived items carry `Some(0)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub today_stars: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forks: Option<u64>,
}

/// An unprocessed feed entry, consumed exactly once by the enricher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNewsItem {
    pub title: String,
    pub url: String,
    /// Extracted article text, HTML-stripped and capped at extraction time.
    pub raw_text: String,
    pub published_at: DateTime<Utc>,
    pub source: String,
}

/// Enriched news entry exposed to consumers. Both summaries are guaranteed
/// non-empty: the extractive fallback fills them when AI enrichment fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    pub url: String,
    pub raw_text: String,
    pub summary_zh: String,
    pub summary_en: String,
    pub published_at: DateTime<Utc>,
    pub source: String,
}

/// The unit the cache manages: ranked repos + enriched news + generation time.
/// Replaced wholesale on refresh, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSnapshot {
    pub trending: Vec<TrendingItem>,
    pub news: Vec<NewsItem>,
    pub last_updated: DateTime<Utc>,
}

impl ContentSnapshot {
    pub fn empty() -> Self {
        Self {
            trending: Vec::new(),
            news: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trending.is_empty() && self.news.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trending_item_skips_absent_optional_fields() {
        let it = TrendingItem {
            title: "rust-lang/rust".into(),
            repo_url: "https://github.com/rust-lang/rust".into(),
            stars: 100_000,
            description: "The Rust language".into(),
            language: None,
            today_stars: None,
            forks: None,
        };
        let json = serde_json::to_value(&it).unwrap();
        assert_eq!(json["repoUrl"], "https://github.com/rust-lang/rust");
        assert!(json.get("language").is_none());
        assert!(json.get("todayStars").is_none());
        assert!(json.get("forks").is_none());
    }

    #[test]
    fn snapshot_serializes_camel_case_timestamp() {
        let snap = ContentSnapshot::empty();
        let json = serde_json::to_value(&snap).unwrap();
        assert!(json.get("lastUpdated").is_some());
        assert_eq!(json["trending"].as_array().unwrap().len(), 0);
    }
}
