//! Web API router construction.

use axum::Router;
use axum::routing::get;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;

use crate::state::AppState;
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::{status, videos};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Creates the web server router
pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health-check", get(status::health))
        .route(
            "/v1/videos/{user_id}",
            get(videos::get_video)
                .post(videos::submit_video)
                .put(videos::update_setting),
        )
        .with_state(app_state);

    Router::new().nest("/api", api_router).layer((
        // Outermost: per-request ID span + severity-proportional response logging.
        RequestIdLayer,
        // The browser extension calls from its own origin.
        CorsLayer::permissive(),
        TimeoutLayer::new(REQUEST_TIMEOUT),
    ))
}
