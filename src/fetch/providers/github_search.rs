// src/fetch/providers/github_search.rs
// Repository discovery via the GitHub search API. Two query sets cover what
// the trending page misses: high-star AI repos and recently created hot repos.
//
// The search API has no notion of a daily star delta, so items from here carry
// `today_stars: Some(0)`. That asymmetry is intentional, not a bug.

use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use serde::Deserialize;

use crate::fetch::types::RepoSource;
use crate::fetch::{with_retry, FetchError, RetryPolicy};
use crate::rank;
use crate::types::TrendingItem;

const SEARCH_URL: &str = "https://api.github.com/search/repositories";
const INTER_QUERY_DELAY: Duration = Duration::from_secs(1);

/// Queries a source issues per fetch. Rendered lazily because the recent-hot
/// window moves with the wall clock.
#[derive(Debug, Clone)]
pub enum QuerySet {
    Fixed(Vec<String>),
    /// `created:>{today - days} stars:>{min_stars}`
    RecentSince { days: i64, min_stars: u32 },
}

impl QuerySet {
    pub fn render(&self) -> Vec<String> {
        match self {
            QuerySet::Fixed(qs) => qs.clone(),
            QuerySet::RecentSince { days, min_stars } => {
                let since = (Utc::now() - chrono::Duration::days(*days))
                    .format("%Y-%m-%d")
                    .to_string();
                vec![format!("created:>{since} stars:>{min_stars}")]
            }
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    items: Vec<SearchRepo>,
}

#[derive(Deserialize)]
struct SearchRepo {
    full_name: String,
    html_url: String,
    stargazers_count: u64,
    description: Option<String>,
    language: Option<String>,
    forks_count: u64,
}

pub struct GithubSearchSource {
    client: reqwest::Client,
    source_name: &'static str,
    queries: QuerySet,
    per_page: u8,
    cap: usize,
    inter_query_delay: Duration,
    policy: RetryPolicy,
}

impl GithubSearchSource {
    /// High-star AI/ML repositories. `queries` usually comes from
    /// `config/sources.toml`; an empty list falls back to the defaults.
    pub fn ai_focus(client: reqwest::Client, queries: Vec<String>) -> Self {
        let queries = if queries.is_empty() {
            vec![
                "artificial intelligence stars:>1000 pushed:>2024-01-01".to_string(),
                "machine learning stars:>1000 pushed:>2024-01-01".to_string(),
            ]
        } else {
            queries
        };
        Self {
            client,
            source_name: "github-search-ai",
            queries: QuerySet::Fixed(queries),
            per_page: 5,
            cap: 10,
            inter_query_delay: INTER_QUERY_DELAY,
            policy: RetryPolicy::default(),
        }
    }

    /// Repositories created in the last month that picked up stars quickly.
    pub fn recent_hot(client: reqwest::Client) -> Self {
        Self {
            client,
            source_name: "github-search-recent",
            queries: QuerySet::RecentSince {
                days: 30,
                min_stars: 50,
            },
            per_page: 10,
            cap: 10,
            inter_query_delay: INTER_QUERY_DELAY,
            policy: RetryPolicy::default(),
        }
    }

    async fn run_query(&self, query: &str) -> Result<Vec<TrendingItem>, FetchError> {
        let resp = self
            .client
            .get(SEARCH_URL)
            .query(&[
                ("q", query),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", &self.per_page.to_string()),
            ])
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        counter!("fetch_items_total").increment(body.items.len() as u64);
        Ok(body.items.into_iter().map(convert).collect())
    }
}

fn convert(repo: SearchRepo) -> TrendingItem {
    TrendingItem {
        title: repo.full_name,
        repo_url: repo.html_url,
        stars: repo.stargazers_count,
        description: repo.description.unwrap_or_default(),
        language: repo.language,
        // The search API cannot observe a daily delta.
        today_stars: Some(0),
        forks: Some(repo.forks_count),
    }
}

#[async_trait::async_trait]
impl RepoSource for GithubSearchSource {
    async fn fetch(&self) -> Result<Vec<TrendingItem>, FetchError> {
        let queries = self.queries.render();
        let mut collected = Vec::new();
        let mut last_err = None;

        for (i, query) in queries.iter().enumerate() {
            // Base retry policy per query; a query that stays down is skipped
            // so its siblings still contribute.
            match with_retry(&self.policy, || self.run_query(query)).await {
                Ok(mut items) => collected.append(&mut items),
                Err(e) => {
                    tracing::warn!(source = self.source_name, query = %query, error = %e, "search query failed");
                    last_err = Some(e);
                }
            }
            if i + 1 < queries.len() {
                // Fixed pause between queries to stay inside the API rate limit.
                tokio::time::sleep(self.inter_query_delay).await;
            }
        }

        if collected.is_empty() {
            if let Some(e) = last_err {
                return Err(e);
            }
        }
        Ok(rank::merge_trending(vec![collected], self.cap))
    }

    fn name(&self) -> &'static str {
        self.source_name
    }
}
