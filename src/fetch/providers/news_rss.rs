// src/fetch/providers/news_rss.rs
// Pulls AI-news entries from a configurable set of RSS feeds. Feeds are
// fetched concurrently and independently; one dead feed never costs the rest.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::fetch::types::NewsSource;
use crate::fetch::{strip_html, truncate_chars, with_retry, FetchError, RetryPolicy};
use crate::types::RawNewsItem;

/// Per-feed item cap; a single chatty feed must not crowd out the others.
const ITEMS_PER_FEED: usize = 5;
/// Raw article text is bounded at extraction time.
const RAW_TEXT_CAP: usize = 500;
/// Very short titles are navigation noise, not articles.
const MIN_TITLE_CHARS: usize = 10;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FeedSpec {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "encoded")]
    content_encoded: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
}

pub struct RssNewsSource {
    client: reqwest::Client,
    feeds: Vec<FeedSpec>,
    limit: usize,
    policy: RetryPolicy,
}

impl RssNewsSource {
    pub fn new(client: reqwest::Client, feeds: Vec<FeedSpec>, limit: usize) -> Self {
        Self {
            client,
            feeds,
            limit,
            policy: RetryPolicy::default(),
        }
    }

    /// Parse one feed document into raw items. Public so fixture tests hit it
    /// without a network.
    pub fn parse_feed(source_name: &str, xml: &str) -> Result<Vec<RawNewsItem>, FetchError> {
        let t0 = std::time::Instant::now();
        let cleaned = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&cleaned).map_err(|e| FetchError::Parse(e.to_string()))?;

        let mut out = Vec::new();
        for it in rss.channel.item.into_iter().take(ITEMS_PER_FEED) {
            let title = it.title.map(|t| strip_html(&t)).unwrap_or_default();
            let url = it.link.unwrap_or_default();
            if url.is_empty() || title.chars().count() <= MIN_TITLE_CHARS {
                continue;
            }
            out.push(RawNewsItem {
                raw_text: extract_body(it.content_encoded.as_deref(), it.description.as_deref())
                    .unwrap_or_else(|| title.clone()),
                title,
                url,
                published_at: it
                    .pub_date
                    .as_deref()
                    .and_then(parse_rfc2822)
                    .unwrap_or_else(Utc::now),
                source: source_name.to_string(),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("fetch_parse_ms").record(ms);
        counter!("fetch_items_total").increment(out.len() as u64);
        Ok(out)
    }

    async fn fetch_feed(&self, feed: &FeedSpec) -> Result<Vec<RawNewsItem>, FetchError> {
        let body = with_retry(&self.policy, || async {
            let resp = self.client.get(&feed.url).send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }
            Ok(resp.text().await?)
        })
        .await?;
        Self::parse_feed(&feed.name, &body)
    }
}

#[async_trait::async_trait]
impl NewsSource for RssNewsSource {
    async fn fetch(&self) -> Result<Vec<RawNewsItem>, FetchError> {
        let fetches = self.feeds.iter().map(|feed| async move {
            match self.fetch_feed(feed).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(feed = %feed.name, error = %e, "feed fetch failed");
                    counter!("fetch_provider_errors_total").increment(1);
                    Vec::new()
                }
            }
        });

        let mut all: Vec<RawNewsItem> = join_all(fetches).await.into_iter().flatten().collect();
        all.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        all.truncate(self.limit);
        Ok(all)
    }

    fn name(&self) -> &'static str {
        "news-rss"
    }
}

/// Prefer the full body over the teaser; fall back to the caller's title.
fn extract_body(content_encoded: Option<&str>, description: Option<&str>) -> Option<String> {
    for candidate in [content_encoded, description].into_iter().flatten() {
        let text = strip_html(candidate);
        if !text.is_empty() {
            return Some(truncate_chars(&text, RAW_TEXT_CAP));
        }
    }
    None
}

/// Feeds routinely embed HTML entities that are not valid XML entities.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
