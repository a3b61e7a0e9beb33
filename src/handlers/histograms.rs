use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::metrics::HistogramInfo;
use crate::AppState;

use super::AppError;

// ─── Request / response types ────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ObserveRequest {
    pub value: u64,
}

#[derive(Debug, Serialize)]
pub struct ObserveResponse {
    pub handle: u32,
    pub name: String,
    pub value: u64,
}

// ─── GET /api/histograms ─────────────────────────────────────────

pub async fn list_histograms(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<HistogramInfo>> {
    Json(state.registry.histograms())
}

// ─── POST /api/histograms/:name/observe ──────────────────────────
/// Records one value by name. The name lookup makes this a slow path;
/// in-process callers should keep the handle from registration instead.

pub async fn observe(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(req): Json<ObserveRequest>,
) -> Result<Json<ObserveResponse>, AppError> {
    let handle = state
        .registry
        .handle_of(&name)
        .ok_or_else(|| AppError::NotFound(format!("histogram {name} is not registered")))?;

    state.registry.observe(handle, req.value);

    Ok(Json(ObserveResponse {
        handle: handle.index(),
        name,
        value: req.value,
    }))
}
