use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use super::export::{BucketSnapshot, Scrape};
use crate::AppState;

// ─── GET /api/metrics ────────────────────────────────────────────
/// One scrape as JSON. Retires the current interval of every histogram,
/// so two scrapers polling the same process split the data between them.

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<Scrape> {
    Json(state.registry.scrape())
}

// ─── GET /api/metrics/buckets ────────────────────────────────────
/// Lifetime bucket counts only. Resets nothing.

pub async fn get_buckets(
    State(state): State<Arc<AppState>>,
) -> Json<HashMap<String, BucketSnapshot>> {
    Json(state.registry.export_bucket_histograms())
}

// ─── GET /api/metrics/stream ─────────────────────────────────────
/// Server-Sent Events endpoint.
/// Pushes a full `Scrape` as JSON every configured scrape interval.

pub async fn metrics_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(state.config.scrape_interval);

    let stream = IntervalStream::new(interval).map(move |_| {
        let scrape = state.registry.scrape();
        let json = serde_json::to_string(&scrape).unwrap_or_default();
        Ok(Event::default().data(json))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
