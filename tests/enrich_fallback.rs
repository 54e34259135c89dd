//! Enricher behavior against stub backends: per-item isolation, retry
//! classification at the backend seam, and the batch deadline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use trendmind::enrich::ai::{Locale, MockSummarizer, Summarizer};
use trendmind::enrich::NewsEnricher;
use trendmind::fetch::FetchError;
use trendmind::types::RawNewsItem;

fn long_item(url: &str) -> RawNewsItem {
    RawNewsItem {
        title: "A headline long enough to keep".into(),
        url: url.to_string(),
        raw_text: "Sentence one is long enough to qualify for the fallback. ".repeat(6),
        published_at: Utc::now(),
        source: "stub".into(),
    }
}

/// Backend that fails with a given status forever, counting calls.
struct FailingBackend {
    status: u16,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl Summarizer for FailingBackend {
    fn is_configured(&self) -> bool {
        true
    }
    async fn summarize(&self, _text: &str, _locale: Locale) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::Status(self.status))
    }
    fn name(&self) -> &'static str {
        "stub-failing"
    }
}

/// Backend that fails once with a 503, then succeeds.
struct FlakyBackend {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl Summarizer for FlakyBackend {
    fn is_configured(&self) -> bool {
        true
    }
    async fn summarize(&self, _text: &str, _locale: Locale) -> Result<String, FetchError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(FetchError::Status(503))
        } else {
            Ok("recovered".into())
        }
    }
    fn name(&self) -> &'static str {
        "stub-flaky"
    }
}

struct SlowBackend;

#[async_trait::async_trait]
impl Summarizer for SlowBackend {
    fn is_configured(&self) -> bool {
        true
    }
    async fn summarize(&self, _text: &str, _locale: Locale) -> Result<String, FetchError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("too late".into())
    }
    fn name(&self) -> &'static str {
        "stub-slow"
    }
}

#[tokio::test]
async fn backend_failure_resolves_to_fallback_without_dropping_items() {
    let backend = Arc::new(FailingBackend {
        status: 500,
        calls: AtomicUsize::new(0),
    });
    let enricher = NewsEnricher::new(backend.clone(), Duration::from_secs(5)).without_delays();

    let out = enricher
        .enrich(vec![long_item("https://e.com/1"), long_item("https://e.com/2")])
        .await;

    assert_eq!(out.len(), 2);
    for item in &out {
        assert!(item.summary_zh.starts_with("Sentence one"));
        assert!(item.summary_en.starts_with("Sentence one"));
    }
    // 2 items x 2 locales x (1 call + 1 retry): the 500 is retryable.
    assert_eq!(backend.calls.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn permanent_backend_errors_are_not_retried() {
    let backend = Arc::new(FailingBackend {
        status: 404,
        calls: AtomicUsize::new(0),
    });
    let enricher = NewsEnricher::new(backend.clone(), Duration::from_secs(5)).without_delays();

    let out = enricher.enrich(vec![long_item("https://e.com/1")]).await;
    assert_eq!(out.len(), 1);
    // 2 locales x 1 call, no retries for a 404.
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn transient_backend_error_recovers_on_retry() {
    let backend = Arc::new(FlakyBackend {
        calls: AtomicUsize::new(0),
    });
    let enricher = NewsEnricher::new(backend.clone(), Duration::from_secs(5)).without_delays();

    let out = enricher.enrich(vec![long_item("https://e.com/1")]).await;
    assert_eq!(out[0].summary_zh, "recovered");
    assert_eq!(out[0].summary_en, "recovered");
    // zh: fail + retry-success; en: success.
    assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn batch_deadline_falls_back_for_every_item() {
    let enricher = NewsEnricher::new(Arc::new(SlowBackend), Duration::from_millis(50)).without_delays();

    let out = enricher
        .enrich(vec![long_item("https://e.com/1"), long_item("https://e.com/2")])
        .await;

    assert_eq!(out.len(), 2, "deadline must not drop items");
    for item in &out {
        assert!(!item.summary_zh.is_empty());
        assert_ne!(item.summary_zh, "too late");
    }
}

#[tokio::test]
async fn unconfigured_backend_short_circuits_to_fallback() {
    let mock = Arc::new(MockSummarizer {
        fixed: "never used".into(),
    });
    // Short text goes straight to the extractive path even with a live backend.
    let enricher = NewsEnricher::new(mock, Duration::from_secs(5)).without_delays();
    let short = RawNewsItem {
        title: "A headline long enough to keep".into(),
        url: "https://e.com/short".into(),
        raw_text: "Brief note.".into(),
        published_at: Utc::now(),
        source: "stub".into(),
    };
    let out = enricher.enrich(vec![short]).await;
    // No sentence clears the minimum length, so the raw text is clipped as-is.
    assert_eq!(out[0].summary_en, "Brief note.");
}
