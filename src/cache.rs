// src/cache.rs
// Single-slot TTL cache in front of the aggregation pipeline. States over the
// one entry: EMPTY (never populated), FRESH (age < TTL), STALE (age >= TTL).
// A stale entry is still served when a refresh fails; only invalidate()
// returns the cache to EMPTY.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::aggregator::Aggregate;
use crate::types::ContentSnapshot;

/// How a `get` call was satisfied; the API layer maps this to HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Fresh entry served without touching the pipeline.
    CacheHit,
    /// Pipeline ran and the entry was replaced.
    Refreshed,
    /// Refresh failed; the previous entry was served as-is.
    StaleServe,
    /// Refresh failed and nothing was ever cached.
    Empty,
}

#[derive(Debug, Clone)]
pub struct Served {
    pub snapshot: ContentSnapshot,
    pub disposition: Disposition,
}

/// Read-only introspection tuple for the cache-status endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub present: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub age_secs: u64,
}

struct CacheEntry {
    snapshot: ContentSnapshot,
    committed_at: Instant,
    committed_wall: DateTime<Utc>,
}

pub struct ContentCache {
    orchestrator: Arc<dyn Aggregate>,
    ttl: Duration,
    // One guard spans check-TTL / refresh / commit, so two concurrent forced
    // refreshes cannot double-run the pipeline.
    slot: Mutex<Option<CacheEntry>>,
}

impl ContentCache {
    pub fn new(orchestrator: Arc<dyn Aggregate>, ttl: Duration) -> Self {
        Self {
            orchestrator,
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Serve a snapshot, refreshing through the orchestrator when forced or
    /// when the entry is stale or missing. Never fails: a failed refresh
    /// degrades to the previous entry, then to an empty snapshot.
    pub async fn get(&self, force_refresh: bool) -> Served {
        let mut slot = self.slot.lock().await;

        if !force_refresh {
            if let Some(entry) = slot.as_ref() {
                if entry.committed_at.elapsed() < self.ttl {
                    counter!("cache_hits_total").increment(1);
                    return Served {
                        snapshot: entry.snapshot.clone(),
                        disposition: Disposition::CacheHit,
                    };
                }
            }
        }

        match self.orchestrator.aggregate().await {
            Ok(mut snapshot) => {
                // Generation timestamps must increase monotonically across
                // commits within one process.
                if let Some(prev) = slot.as_ref() {
                    if snapshot.last_updated <= prev.snapshot.last_updated {
                        snapshot.last_updated =
                            prev.snapshot.last_updated + chrono::Duration::milliseconds(1);
                    }
                }
                *slot = Some(CacheEntry {
                    snapshot: snapshot.clone(),
                    committed_at: Instant::now(),
                    committed_wall: Utc::now(),
                });
                Served {
                    snapshot,
                    disposition: Disposition::Refreshed,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "refresh failed");
                match slot.as_ref() {
                    Some(entry) => {
                        counter!("cache_stale_serves_total").increment(1);
                        Served {
                            snapshot: entry.snapshot.clone(),
                            disposition: Disposition::StaleServe,
                        }
                    }
                    None => Served {
                        snapshot: ContentSnapshot::empty(),
                        disposition: Disposition::Empty,
                    },
                }
            }
        }
    }

    /// Read the current entry without refreshing, regardless of staleness.
    pub async fn peek(&self) -> Option<ContentSnapshot> {
        let slot = self.slot.lock().await;
        slot.as_ref().map(|entry| entry.snapshot.clone())
    }

    /// Unconditionally drop the entry (state returns to EMPTY).
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        *slot = None;
        tracing::info!("content cache cleared");
    }

    /// Side-effect-free snapshot of the cache state.
    pub async fn status(&self) -> CacheStatus {
        let slot = self.slot.lock().await;
        match slot.as_ref() {
            Some(entry) => CacheStatus {
                present: true,
                last_update: Some(entry.committed_wall),
                age_secs: entry.committed_at.elapsed().as_secs(),
            },
            None => CacheStatus {
                present: false,
                last_update: None,
                age_secs: 0,
            },
        }
    }
}
