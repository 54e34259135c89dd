// src/api.rs
// HTTP surface: cached content reads, cache control, and the authenticated
// scheduled-aggregation trigger. Handlers map cache dispositions onto the
// availability contract: 200 with data whenever any entry exists, 206 when
// that data is a stale fallback, 500 only when nothing was ever aggregated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::timeout;
use tower_http::cors::CorsLayer;

use crate::cache::{ContentCache, Disposition};
use crate::notify::DigestMailer;
use crate::types::ContentSnapshot;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ContentCache>,
    pub request_timeout: Duration,
    pub cron_secret: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/content", get(get_content).post(content_action))
        .route("/api/cron/daily", get(cron_daily).post(cron_daily_action))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct ContentQuery {
    #[serde(default)]
    refresh: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentEnvelope {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    data: ContentSnapshot,
    meta: Meta,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Meta {
    request_time: DateTime<Utc>,
    /// Wall time spent serving this request, as `"123ms"`.
    duration: String,
    cached: bool,
}

impl Meta {
    fn since(start: Instant, cached: bool) -> Self {
        Self {
            request_time: Utc::now(),
            duration: format!("{}ms", start.elapsed().as_millis()),
            cached,
        }
    }
}

/// GET /api/content?refresh=true
///
/// The whole request carries its own timeout, independent of the pipeline
/// deadlines underneath; on expiry the in-flight work is abandoned and the
/// cache is read without refreshing.
async fn get_content(
    State(state): State<AppState>,
    Query(q): Query<ContentQuery>,
) -> (StatusCode, Json<ContentEnvelope>) {
    let start = Instant::now();
    tracing::info!(force_refresh = q.refresh, "content request");

    let served = match timeout(state.request_timeout, state.cache.get(q.refresh)).await {
        Ok(served) => served,
        Err(_) => {
            tracing::warn!("content request hit the request-level timeout");
            return match state.cache.peek().await {
                Some(snapshot) => (
                    StatusCode::PARTIAL_CONTENT,
                    Json(ContentEnvelope {
                        success: false,
                        error: Some("request timed out; returning cached data".into()),
                        data: snapshot,
                        meta: Meta::since(start, true),
                    }),
                ),
                None => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ContentEnvelope {
                        success: false,
                        error: Some("request timed out".into()),
                        data: ContentSnapshot::empty(),
                        meta: Meta::since(start, false),
                    }),
                ),
            };
        }
    };

    tracing::info!(
        duration_ms = start.elapsed().as_millis() as u64,
        disposition = ?served.disposition,
        "content request complete"
    );

    match served.disposition {
        Disposition::CacheHit | Disposition::Refreshed => {
            let cached = served.disposition == Disposition::CacheHit;
            (
                StatusCode::OK,
                Json(ContentEnvelope {
                    success: true,
                    error: None,
                    data: served.snapshot,
                    meta: Meta::since(start, cached),
                }),
            )
        }
        Disposition::StaleServe => (
            StatusCode::PARTIAL_CONTENT,
            Json(ContentEnvelope {
                success: false,
                error: Some("refresh failed; returning cached data".into()),
                data: served.snapshot,
                meta: Meta::since(start, true),
            }),
        ),
        Disposition::Empty => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ContentEnvelope {
                success: false,
                error: Some("failed to fetch content".into()),
                data: served.snapshot,
                meta: Meta::since(start, false),
            }),
        ),
    }
}

#[derive(Deserialize)]
struct ActionBody {
    action: String,
}

/// POST /api/content — cache control: `clear-cache` or `cache-status`.
async fn content_action(
    State(state): State<AppState>,
    Json(body): Json<ActionBody>,
) -> (StatusCode, Json<Value>) {
    match body.action.as_str() {
        "clear-cache" => {
            state.cache.invalidate().await;
            (
                StatusCode::OK,
                Json(json!({ "success": true, "message": "cache cleared" })),
            )
        }
        "cache-status" => {
            let status = state.cache.status().await;
            (
                StatusCode::OK,
                Json(json!({ "success": true, "data": status })),
            )
        }
        other => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": format!("invalid action: {other}") })),
        ),
    }
}

fn authorized(headers: &HeaderMap, secret: &Option<String>) -> bool {
    // The check only applies when a secret is configured.
    let Some(secret) = secret else { return true };
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {secret}"))
        .unwrap_or(false)
}

/// GET /api/cron/daily — forced refresh, reports aggregated counts.
async fn cron_daily(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers, &state.cron_secret) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "unauthorized" })),
        );
    }

    tracing::info!("scheduled aggregation triggered");
    let served = state.cache.get(true).await;
    if served.disposition == Disposition::Empty {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": "failed to aggregate content" })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "daily content aggregation completed",
            "data": {
                "trending": served.snapshot.trending.len(),
                "news": served.snapshot.news.len(),
                "lastUpdated": served.snapshot.last_updated,
            }
        })),
    )
}

#[derive(Deserialize)]
struct CronBody {
    action: String,
    #[serde(default)]
    send_email: bool,
}

/// POST /api/cron/daily — manual trigger, optional digest fan-out. The email
/// outcome is reported in the payload and never fails the aggregation reply.
async fn cron_daily_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CronBody>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers, &state.cron_secret) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "unauthorized" })),
        );
    }
    if body.action != "aggregate" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": format!("invalid action: {}", body.action) })),
        );
    }

    let served = state.cache.get(true).await;
    if served.disposition == Disposition::Empty {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": "failed to aggregate content" })),
        );
    }

    let email = if body.send_email {
        Some(send_digest(&served.snapshot).await)
    } else {
        None
    };

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "manual aggregation completed",
            "data": {
                "content": {
                    "trending": served.snapshot.trending.len(),
                    "news": served.snapshot.news.len(),
                    "lastUpdated": served.snapshot.last_updated,
                },
                "email": email,
            }
        })),
    )
}

async fn send_digest(snapshot: &ContentSnapshot) -> Value {
    let mailer = match DigestMailer::from_env() {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, "digest mailer not configured");
            return json!({ "success": false, "error": e.to_string() });
        }
    };
    match mailer.send_digest(snapshot).await {
        Ok(()) => json!({ "success": true }),
        Err(e) => {
            tracing::warn!(error = %e, "digest send failed");
            json!({ "success": false, "error": e.to_string() })
        }
    }
}
