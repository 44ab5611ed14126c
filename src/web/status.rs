//! Health check handler.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use tracing::trace;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    commit: &'static str,
    timestamp: String,
    /// Snapshot has changes not yet flushed.
    pending_flush: bool,
}

/// `GET /api/health-check`
pub(super) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    trace!("health check requested");
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        commit: env!("GIT_COMMIT_SHORT"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        pending_flush: state.cache.is_dirty(),
    })
}
