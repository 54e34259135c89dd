//! Component-level tests for the content cache state machine against stub
//! orchestrators: freshness short-circuit, stale-serve on refresh failure,
//! cold-empty behavior, invalidation, and timestamp monotonicity.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::Utc;

use trendmind::aggregator::Aggregate;
use trendmind::cache::{ContentCache, Disposition};
use trendmind::types::{ContentSnapshot, TrendingItem};

fn sample_snapshot() -> ContentSnapshot {
    ContentSnapshot {
        trending: vec![TrendingItem {
            title: "acme/widget".into(),
            repo_url: "https://github.com/acme/widget".into(),
            stars: 42,
            description: "A widget".into(),
            language: None,
            today_stars: None,
            forks: None,
        }],
        news: vec![],
        last_updated: Utc::now(),
    }
}

/// Orchestrator stub that counts invocations and can be switched to fail.
struct StubOrchestrator {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl StubOrchestrator {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(fail),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Aggregate for StubOrchestrator {
    async fn aggregate(&self) -> Result<ContentSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            bail!("upstream unavailable");
        }
        Ok(sample_snapshot())
    }
}

const TTL: Duration = Duration::from_secs(30 * 60);

#[tokio::test]
async fn fresh_entry_is_served_without_invoking_the_orchestrator() {
    let stub = StubOrchestrator::new(false);
    let cache = ContentCache::new(stub.clone(), TTL);

    let first = cache.get(false).await;
    assert_eq!(first.disposition, Disposition::Refreshed);
    assert_eq!(stub.calls(), 1);

    let second = cache.get(false).await;
    assert_eq!(second.disposition, Disposition::CacheHit);
    assert_eq!(second.snapshot, first.snapshot, "identical snapshot served");
    assert_eq!(stub.calls(), 1, "fresh hit must not re-run the pipeline");
}

#[tokio::test]
async fn force_refresh_bypasses_a_fresh_entry() {
    let stub = StubOrchestrator::new(false);
    let cache = ContentCache::new(stub.clone(), TTL);

    cache.get(false).await;
    let forced = cache.get(true).await;
    assert_eq!(forced.disposition, Disposition::Refreshed);
    assert_eq!(stub.calls(), 2);
}

#[tokio::test]
async fn stale_entry_triggers_refresh_after_ttl() {
    let stub = StubOrchestrator::new(false);
    let cache = ContentCache::new(stub.clone(), Duration::from_millis(20));

    cache.get(false).await;
    tokio::time::sleep(Duration::from_millis(40)).await;
    let again = cache.get(false).await;
    assert_eq!(again.disposition, Disposition::Refreshed);
    assert_eq!(stub.calls(), 2);
}

#[tokio::test]
async fn failed_refresh_serves_the_previous_snapshot_unchanged() {
    let stub = StubOrchestrator::new(false);
    let cache = ContentCache::new(stub.clone(), TTL);

    let populated = cache.get(true).await;
    stub.fail.store(true, Ordering::SeqCst);

    let served = cache.get(true).await;
    assert_eq!(served.disposition, Disposition::StaleServe);
    assert_eq!(served.snapshot, populated.snapshot, "not an empty snapshot");
}

#[tokio::test]
async fn cold_cache_with_failing_orchestrator_yields_empty_snapshot() {
    let stub = StubOrchestrator::new(true);
    let cache = ContentCache::new(stub.clone(), TTL);

    let served = cache.get(true).await;
    assert_eq!(served.disposition, Disposition::Empty);
    assert!(served.snapshot.trending.is_empty());
    assert!(served.snapshot.news.is_empty());
}

#[tokio::test]
async fn invalidate_returns_cache_to_empty() {
    let stub = StubOrchestrator::new(false);
    let cache = ContentCache::new(stub.clone(), TTL);

    cache.get(false).await;
    assert!(cache.status().await.present);

    cache.invalidate().await;
    let status = cache.status().await;
    assert!(!status.present);
    assert!(status.last_update.is_none());

    // Next read must repopulate.
    let served = cache.get(false).await;
    assert_eq!(served.disposition, Disposition::Refreshed);
    assert_eq!(stub.calls(), 2);
}

#[tokio::test]
async fn status_reports_without_side_effects() {
    let stub = StubOrchestrator::new(false);
    let cache = ContentCache::new(stub.clone(), TTL);

    let empty = cache.status().await;
    assert!(!empty.present);
    assert_eq!(stub.calls(), 0, "status must not trigger aggregation");

    cache.get(false).await;
    let populated = cache.status().await;
    assert!(populated.present);
    assert!(populated.last_update.is_some());
    assert_eq!(stub.calls(), 1);
}

/// Orchestrator that always stamps the same wall-clock time, to exercise the
/// monotonicity clamp at commit.
struct FixedClockOrchestrator {
    ts: chrono::DateTime<Utc>,
}

#[async_trait::async_trait]
impl Aggregate for FixedClockOrchestrator {
    async fn aggregate(&self) -> Result<ContentSnapshot> {
        Ok(ContentSnapshot {
            trending: vec![],
            news: vec![],
            last_updated: self.ts,
        })
    }
}

#[tokio::test]
async fn committed_timestamps_increase_monotonically() {
    let stub = Arc::new(FixedClockOrchestrator { ts: Utc::now() });
    let cache = ContentCache::new(stub, TTL);

    let first = cache.get(true).await;
    let second = cache.get(true).await;
    assert!(second.snapshot.last_updated > first.snapshot.last_updated);
}
