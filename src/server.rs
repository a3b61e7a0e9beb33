use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::metrics::stream;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Histogram endpoints ─────────────────────────────────
        .route("/api/histograms", get(handlers::histograms::list_histograms))
        .route(
            "/api/histograms/:name/observe",
            post(handlers::histograms::observe),
        )
        // ── Load generator control ──────────────────────────────
        .route("/api/load/start", post(handlers::load::start_load))
        .route("/api/load/stop", post(handlers::load::stop_load))
        .route("/api/load/status", get(handlers::load::load_status))
        // ── Scrape ──────────────────────────────────────────────
        .route("/api/metrics", get(stream::get_metrics))
        .route("/api/metrics/buckets", get(stream::get_buckets))
        .route("/api/metrics/stream", get(stream::metrics_stream))
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            timing::timing_middleware,
        ))
        .layer(CorsLayer::permissive())
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
}
