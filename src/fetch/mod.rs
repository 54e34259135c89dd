// src/fetch/mod.rs
// Shared machinery for every external source: error taxonomy, retry policy,
// display-count parsing, and HTML-to-text normalization.

pub mod providers;
pub mod types;

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// Per-call network timeout for source fetches.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Browser-ish UA; the trending page serves a reduced layout to unknown agents.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "fetch_provider_errors_total",
            "Source fetch/parse errors after retry exhaustion."
        );
        describe_counter!("fetch_retries_total", "Retries attempted across all sources.");
        describe_counter!("fetch_items_total", "Items parsed from sources.");
        describe_counter!(
            "enrich_fallback_total",
            "News items that resolved to the extractive fallback summary."
        );
        describe_counter!("aggregate_runs_total", "Aggregation cycles started.");
        describe_counter!(
            "aggregate_deadline_total",
            "Aggregation cycles abandoned at the overall deadline."
        );
        describe_counter!("cache_hits_total", "Content served from a fresh cache entry.");
        describe_counter!(
            "cache_stale_serves_total",
            "Content served stale after a failed refresh."
        );
        describe_histogram!("fetch_parse_ms", "Source parse time in milliseconds.");
        describe_gauge!("aggregate_last_run_ts", "Unix ts of the last aggregation run.");
    });
}

/// Everything that can go wrong talking to a source, shaped so the retry
/// classifier can tell transient from permanent without string matching.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connection reset/aborted/refused, DNS failure, or a timed-out call.
    #[error("network error: {0}")]
    Network(String),
    /// Non-success HTTP status from the upstream.
    #[error("http status {0}")]
    Status(u16),
    /// Response arrived but could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),
}

impl FetchError {
    /// Transient errors are worth one more attempt; 4xx and parse failures
    /// are permanent for this cycle.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status(code) => *code >= 500,
            FetchError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            return FetchError::Network(e.to_string());
        }
        match e.status() {
            Some(code) => FetchError::Status(code.as_u16()),
            None => FetchError::Network(e.to_string()),
        }
    }
}

/// Bounded-retry policy decoupled from the I/O call, testable against
/// synthetic error sequences.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// `attempt` is zero-based: the delay before attempt `attempt + 1`.
    /// `None` means give up.
    pub fn next_delay(&self, attempt: u32, error: &FetchError) -> Option<Duration> {
        if attempt < self.max_retries && error.is_retryable() {
            Some(self.backoff)
        } else {
            None
        }
    }
}

/// Drive an async operation against a retry policy. The operation owns its
/// per-call timeout; this loop only decides whether to go again.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => match policy.next_delay(attempt, &e) {
                Some(delay) => {
                    counter!("fetch_retries_total").increment(1);
                    tracing::warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "retrying fetch");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(e),
            },
        }
    }
}

/// Build the shared HTTP client used by all sources.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(CALL_TIMEOUT)
        .build()
        .expect("reqwest client")
}

/// Parse display counts like "1.2k", "12,345", " 384 " into integers.
/// Unparsable input yields 0.
pub fn parse_count(text: &str) -> u64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',' || *c == 'k' || *c == 'K')
        .collect();
    if cleaned.is_empty() {
        return 0;
    }
    if cleaned.contains(['k', 'K']) {
        let base = cleaned.trim_end_matches(['k', 'K']).replace(',', "");
        return base
            .parse::<f64>()
            .map(|v| (v * 1000.0).round() as u64)
            .unwrap_or(0);
    }
    cleaned.replace(',', "").parse::<u64>().unwrap_or(0)
}

/// Strip markup and collapse whitespace so feed bodies become plain text.
pub fn strip_html(html: &str) -> String {
    static RE_SCRIPT: OnceCell<regex::Regex> = OnceCell::new();
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();

    let re_script = RE_SCRIPT
        .get_or_init(|| regex::Regex::new(r"(?is)<(script|style)\b.*?</(script|style)>").unwrap());
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());

    let without_blocks = re_script.replace_all(html, " ");
    let without_tags = re_tags.replace_all(&without_blocks, " ");
    let decoded = html_escape::decode_html_entities(without_tags.as_ref()).to_string();
    re_ws.replace_all(&decoded, " ").trim().to_string()
}

/// Truncate on a char boundary; feed bodies can be CJK.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}
