// src/fetch/providers/github_trending.rs
// Scrapes the GitHub trending page. This is the only source that can observe
// today's star delta; the search-API sources cannot.

use metrics::{counter, histogram};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::fetch::types::RepoSource;
use crate::fetch::{parse_count, with_retry, FetchError, RetryPolicy};
use crate::types::TrendingItem;

const TRENDING_URL: &str = "https://github.com/trending";
const MAX_ITEMS: usize = 25;

static SEL_ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article.Box-row").expect("row selector"));
static SEL_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h2 a").expect("title selector"));
static SEL_DESC: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("desc selector"));
static SEL_LANG: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[itemprop="programmingLanguage"]"#).expect("lang selector"));
static SEL_STARS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href$="/stargazers"]"#).expect("stars selector"));
static SEL_FORKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href$="/forks"]"#).expect("forks selector"));
static SEL_TODAY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.d-inline-block.float-sm-right").expect("today selector"));

pub struct GithubTrendingSource {
    client: reqwest::Client,
    url: String,
    policy: RetryPolicy,
}

impl GithubTrendingSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            url: TRENDING_URL.to_string(),
            policy: RetryPolicy::default(),
        }
    }

    /// Extract trending rows from the page markup. Kept separate from the
    /// HTTP path so fixtures can exercise it directly.
    pub fn parse_document(html: &str) -> Vec<TrendingItem> {
        let t0 = std::time::Instant::now();
        let doc = Html::parse_document(html);
        let mut out = Vec::new();

        for row in doc.select(&SEL_ROW) {
            let Some(anchor) = row.select(&SEL_TITLE).next() else {
                continue;
            };
            let title = collapse_ws(&anchor.text().collect::<String>());
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if title.is_empty() {
                continue;
            }
            let repo_url = format!("https://github.com{href}");

            let description = row
                .select(&SEL_DESC)
                .next()
                .map(|p| collapse_ws(&p.text().collect::<String>()))
                .unwrap_or_default();
            let language = row
                .select(&SEL_LANG)
                .next()
                .map(|l| l.text().collect::<String>().trim().to_string())
                .filter(|l| !l.is_empty());
            let stars = row
                .select(&SEL_STARS)
                .next()
                .map(|a| parse_count(&a.text().collect::<String>()))
                .unwrap_or(0);
            let forks = row
                .select(&SEL_FORKS)
                .next()
                .map(|a| parse_count(&a.text().collect::<String>()));
            let today_stars = row
                .select(&SEL_TODAY)
                .next()
                .map(|s| parse_count(&s.text().collect::<String>()));

            out.push(TrendingItem {
                title,
                repo_url,
                stars,
                description,
                language,
                today_stars,
                forks,
            });
            if out.len() >= MAX_ITEMS {
                break;
            }
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("fetch_parse_ms").record(ms);
        counter!("fetch_items_total").increment(out.len() as u64);
        out
    }

    async fn fetch_once(&self) -> Result<Vec<TrendingItem>, FetchError> {
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = resp.text().await?;
        let items = Self::parse_document(&body);
        if items.is_empty() {
            // A markup change would land here rather than as a silent empty cycle.
            return Err(FetchError::Parse("no trending rows matched".into()));
        }
        Ok(items)
    }
}

#[async_trait::async_trait]
impl RepoSource for GithubTrendingSource {
    async fn fetch(&self) -> Result<Vec<TrendingItem>, FetchError> {
        with_retry(&self.policy, || self.fetch_once()).await
    }

    fn name(&self) -> &'static str {
        "github-trending"
    }
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
