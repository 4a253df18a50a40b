//! Non-artifact endpoints of the Turborepo cache API.

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct CacheStatus {
    status: &'static str,
}

/// POST /v8/artifacts/events — the client reports cache usage analytics
/// here. They are not interesting to the proxy; acknowledge and drop.
pub async fn record_events() -> StatusCode {
    StatusCode::OK
}

/// GET /v8/artifacts/status — reports the cache as enabled. Also doubles
/// as the supervisor's readiness probe target.
pub async fn cache_status() -> Json<CacheStatus> {
    Json(CacheStatus { status: "enabled" })
}
