use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::AppState;

/// Tower-compatible middleware that records every API request's wall time
/// (μs) into the `http_request_us` histogram and adds two response headers:
///
///   X-Response-Time-Us: total handler wall time in microseconds
///   Server-Timing: same value in the standard Server-Timing format
pub async fn timing_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);

    // The SSE stream stays open for minutes and would swamp the histogram
    let is_stream = path.contains("/stream");
    if !is_stream {
        state.registry.observe(state.http_request, us);
    }

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = us.to_string().parse() {
        response.headers_mut().insert("X-Response-Time-Us", val);
    }

    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    if !is_stream {
        debug!(
            status = response.status().as_u16(),
            %method,
            path = %path,
            us,
            "request"
        );
    }

    response
}
