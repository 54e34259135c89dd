// src/aggregator.rs
// Runs every source concurrently under one deadline and assembles the
// snapshot. One failing source costs its own partial result, nothing else.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::Utc;
use futures::future::join_all;
use metrics::{counter, gauge};
use tokio::time::timeout;

use crate::enrich::NewsEnricher;
use crate::fetch::types::{NewsSource, RepoSource};
use crate::fetch;
use crate::rank;
use crate::types::{ContentSnapshot, RawNewsItem, TrendingItem};

/// Seam between the cache and the pipeline, so cache behavior is testable
/// against stub implementations.
#[async_trait::async_trait]
pub trait Aggregate: Send + Sync {
    /// Produce a fresh snapshot. The only error surfaced is the overall
    /// deadline; every other failure degrades to an empty partial inside.
    async fn aggregate(&self) -> Result<ContentSnapshot>;
}

pub struct Aggregator {
    repo_sources: Vec<Arc<dyn RepoSource>>,
    news_source: Arc<dyn NewsSource>,
    enricher: NewsEnricher,
    overall_deadline: Duration,
    trending_cap: usize,
    news_take: usize,
}

impl Aggregator {
    pub fn new(
        repo_sources: Vec<Arc<dyn RepoSource>>,
        news_source: Arc<dyn NewsSource>,
        enricher: NewsEnricher,
        overall_deadline: Duration,
        trending_cap: usize,
        news_take: usize,
    ) -> Self {
        Self {
            repo_sources,
            news_source,
            enricher,
            overall_deadline,
            trending_cap,
            news_take,
        }
    }

    /// Wire up the production pipeline: trending scrape, both search query
    /// sets, the RSS news source, and the summarizer from the environment.
    pub fn from_config(cfg: &crate::config::AppConfig) -> Self {
        use crate::fetch::providers::github_search::GithubSearchSource;
        use crate::fetch::providers::github_trending::GithubTrendingSource;
        use crate::fetch::providers::news_rss::RssNewsSource;

        let client = fetch::http_client();
        // The trending page comes first so its delta-bearing rows win the
        // first-seen dedup over search results for the same repo.
        let repo_sources: Vec<Arc<dyn RepoSource>> = vec![
            Arc::new(GithubTrendingSource::new(client.clone())),
            Arc::new(GithubSearchSource::ai_focus(
                client.clone(),
                cfg.search_queries.clone(),
            )),
            Arc::new(GithubSearchSource::recent_hot(client.clone())),
        ];
        let news_source = Arc::new(RssNewsSource::new(
            client,
            cfg.feeds.clone(),
            cfg.news_fetch_limit,
        ));
        let enricher = NewsEnricher::new(crate::enrich::ai::build_summarizer(), cfg.enrich_timeout);

        Self::new(
            repo_sources,
            news_source,
            enricher,
            cfg.overall_deadline,
            cfg.trending_cap,
            cfg.news_take,
        )
    }

    /// All-settled fetch of every repo source plus the news source. Each arm
    /// resolves independently; an `Err` becomes an empty partial with a log
    /// line and a counter, never an abort.
    async fn fetch_all(&self) -> (Vec<Vec<TrendingItem>>, Vec<RawNewsItem>) {
        let repo_futs = self.repo_sources.iter().map(|src| async move {
            match src.fetch().await {
                Ok(items) => {
                    tracing::info!(source = src.name(), items = items.len(), "repo source done");
                    items
                }
                Err(e) => {
                    tracing::warn!(source = src.name(), error = %e, "repo source failed");
                    counter!("fetch_provider_errors_total").increment(1);
                    Vec::new()
                }
            }
        });

        let news_fut = async {
            match self.news_source.fetch().await {
                Ok(items) => {
                    tracing::info!(
                        source = self.news_source.name(),
                        items = items.len(),
                        "news source done"
                    );
                    items
                }
                Err(e) => {
                    tracing::warn!(source = self.news_source.name(), error = %e, "news source failed");
                    counter!("fetch_provider_errors_total").increment(1);
                    Vec::new()
                }
            }
        };

        tokio::join!(join_all(repo_futs), news_fut)
    }
}

#[async_trait::async_trait]
impl Aggregate for Aggregator {
    async fn aggregate(&self) -> Result<ContentSnapshot> {
        fetch::ensure_metrics_described();
        counter!("aggregate_runs_total").increment(1);

        let assembled = timeout(self.overall_deadline, async {
            let (repo_lists, mut raw_news) = self.fetch_all().await;

            let trending = rank::merge_trending(repo_lists, self.trending_cap);
            raw_news.truncate(self.news_take);

            tracing::info!(
                trending = trending.len(),
                raw_news = raw_news.len(),
                "fetch phase complete; enriching news"
            );

            // The enricher carries its own nested sub-deadline.
            let news = self.enricher.enrich(raw_news).await;

            ContentSnapshot {
                trending,
                news,
                last_updated: Utc::now(),
            }
        })
        .await;

        gauge!("aggregate_last_run_ts").set(Utc::now().timestamp() as f64);

        match assembled {
            Ok(snapshot) => {
                tracing::info!(
                    trending = snapshot.trending.len(),
                    news = snapshot.news.len(),
                    "aggregation cycle complete"
                );
                Ok(snapshot)
            }
            Err(_) => {
                counter!("aggregate_deadline_total").increment(1);
                bail!(
                    "aggregation exceeded the overall deadline of {:?}",
                    self.overall_deadline
                )
            }
        }
    }
}
