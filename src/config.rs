// src/config.rs
// Runtime tunables from env vars (with defaults that match the documented
// timeout/TTL layering) plus the source lists from config/sources.toml.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::fetch::providers::news_rss::FeedSpec;

const ENV_SOURCES_PATH: &str = "SOURCES_CONFIG_PATH";
const DEFAULT_SOURCES_PATH: &str = "config/sources.toml";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Snapshot TTL; refreshes are bounded to once per window under normal load.
    pub cache_ttl: Duration,
    /// Overall aggregation deadline (outermost pipeline timeout).
    pub overall_deadline: Duration,
    /// News-enrichment sub-deadline, nested inside the overall deadline.
    pub enrich_timeout: Duration,
    /// Request-level guard on the content endpoint, independent of the above.
    pub request_timeout: Duration,
    pub trending_cap: usize,
    /// Most-recent raw news items handed to the enricher.
    pub news_take: usize,
    /// Raw news items collected across feeds before the take.
    pub news_fetch_limit: usize,
    /// Bearer token for the scheduled-aggregation endpoint. Unset disables
    /// the check (local runs).
    pub cron_secret: Option<String>,
    pub feeds: Vec<FeedSpec>,
    pub search_queries: Vec<String>,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let sources = load_sources().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load sources config; using built-in defaults");
            SourcesConfig::default()
        });

        Self {
            cache_ttl: Duration::from_secs(env_u64("CONTENT_CACHE_TTL_SECS", 30 * 60)),
            overall_deadline: Duration::from_secs(env_u64("AGGREGATE_DEADLINE_SECS", 60)),
            enrich_timeout: Duration::from_secs(env_u64("ENRICH_BATCH_TIMEOUT_SECS", 30)),
            request_timeout: Duration::from_secs(env_u64("API_REQUEST_TIMEOUT_SECS", 55)),
            trending_cap: env_u64("TRENDING_CAP", 50) as usize,
            news_take: env_u64("NEWS_TAKE", 20) as usize,
            news_fetch_limit: env_u64("NEWS_FETCH_LIMIT", 50) as usize,
            cron_secret: std::env::var("CRON_SECRET").ok().filter(|s| !s.is_empty()),
            feeds: sources.feeds,
            search_queries: sources.search.ai_queries,
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into()),
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub feeds: Vec<FeedSpec>,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub ai_queries: Vec<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        let feed = |name: &str, url: &str| FeedSpec {
            name: name.to_string(),
            url: url.to_string(),
        };
        Self {
            feeds: vec![
                feed("Hacker News", "https://hnrss.org/frontpage"),
                feed("AI News", "https://artificialintelligence-news.com/feed/"),
                feed("机器之心", "https://www.jiqizhixin.com/rss"),
                feed("虎嗅网-科技", "https://www.huxiu.com/rss/0.xml"),
                feed("雷锋网AI", "https://www.leiphone.com/feed"),
            ],
            search: SearchConfig {
                ai_queries: vec![
                    "artificial intelligence stars:>1000 pushed:>2024-01-01".to_string(),
                    "machine learning stars:>1000 pushed:>2024-01-01".to_string(),
                ],
            },
        }
    }
}

/// Load source lists with the usual fallback chain:
/// 1) $SOURCES_CONFIG_PATH  2) config/sources.toml  3) compiled-in defaults.
pub fn load_sources() -> Result<SourcesConfig> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        return load_sources_from(&PathBuf::from(p));
    }
    let default_path = Path::new(DEFAULT_SOURCES_PATH);
    if default_path.exists() {
        return load_sources_from(default_path);
    }
    Ok(SourcesConfig::default())
}

pub fn load_sources_from(path: &Path) -> Result<SourcesConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading sources config from {}", path.display()))?;
    let cfg: SourcesConfig = toml::from_str(&content)
        .with_context(|| format!("parsing sources config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_toml_parses_feeds_and_queries() {
        let toml = r#"
            [[feeds]]
            name = "Hacker News"
            url = "https://hnrss.org/frontpage"

            [[feeds]]
            name = "AI News"
            url = "https://artificialintelligence-news.com/feed/"

            [search]
            ai_queries = ["llm stars:>500"]
        "#;
        let cfg: SourcesConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.feeds.len(), 2);
        assert_eq!(cfg.feeds[0].name, "Hacker News");
        assert_eq!(cfg.search.ai_queries, vec!["llm stars:>500".to_string()]);
    }

    #[test]
    fn defaults_carry_feeds_and_queries() {
        let cfg = SourcesConfig::default();
        assert!(!cfg.feeds.is_empty());
        assert!(!cfg.search.ai_queries.is_empty());
    }

    #[test]
    fn env_u64_falls_back_on_garbage() {
        std::env::remove_var("TRENDMIND_TEST_ENV_U64");
        assert_eq!(env_u64("TRENDMIND_TEST_ENV_U64", 42), 42);
    }

    #[test]
    #[serial_test::serial]
    fn from_env_reads_overrides_and_defaults() {
        std::env::set_var("CONTENT_CACHE_TTL_SECS", "60");
        std::env::remove_var("AGGREGATE_DEADLINE_SECS");
        std::env::remove_var("CRON_SECRET");

        let cfg = AppConfig::from_env();
        assert_eq!(cfg.cache_ttl, Duration::from_secs(60));
        assert_eq!(cfg.overall_deadline, Duration::from_secs(60));
        assert_eq!(cfg.request_timeout, Duration::from_secs(55));
        assert_eq!(cfg.cron_secret, None);

        std::env::remove_var("CONTENT_CACHE_TTL_SECS");
    }

    #[test]
    #[serial_test::serial]
    fn empty_cron_secret_disables_auth() {
        std::env::set_var("CRON_SECRET", "");
        let cfg = AppConfig::from_env();
        assert_eq!(cfg.cron_secret, None);
        std::env::remove_var("CRON_SECRET");
    }
}
