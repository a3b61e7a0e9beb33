use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::LoadConfig;
use crate::AppState;

use super::AppError;

#[derive(Debug, Serialize)]
pub struct LoadStatus {
    pub running: bool,
    pub message: String,
}

// ─── POST /api/load/start ────────────────────────────────────────

pub async fn start_load(
    State(state): State<Arc<AppState>>,
    Json(config): Json<LoadConfig>,
) -> Result<Json<LoadStatus>, AppError> {
    config.validate().map_err(AppError::BadRequest)?;

    // Guard: only one run at a time. The swap closes the race between
    // two concurrent start requests.
    if state.load_running.swap(true, Ordering::SeqCst) {
        return Err(AppError::AlreadyRunning);
    }

    let msg = format!(
        "Started: {} workers × {}s, {}% gets / {}% sets",
        config.workers,
        config.duration_secs,
        config.read_pct,
        100u8.saturating_sub(config.read_pct),
    );
    info!(
        workers = config.workers,
        duration_secs = config.duration_secs,
        read_pct = config.read_pct,
        "load generator started"
    );

    spawn_load(&state, config).await;

    Ok(Json(LoadStatus {
        running: true,
        message: msg,
    }))
}

/// Spawn the workload and stash its handle so `stop` can await it.
/// The caller must already have set `load_running`.
pub async fn spawn_load(state: &Arc<AppState>, config: LoadConfig) {
    let running = state.load_running.clone();
    let registry = state.registry.clone();
    let histograms = state.relay;

    let handle = tokio::spawn(async move {
        crate::load_generator::run(running, registry, histograms, config).await;
    });

    let mut guard = state.load_handle.lock().await;
    *guard = Some(handle);
}

/// Wait for a load run to finish. A panicked or cancelled run is logged
/// and reported as `false`.
async fn join_load(handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(err) => {
            warn!(%err, "load generator task failed");
            false
        }
    }
}

// ─── POST /api/load/stop ─────────────────────────────────────────

pub async fn stop_load(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LoadStatus>, AppError> {
    if !state.load_running.load(Ordering::SeqCst) {
        return Ok(Json(LoadStatus {
            running: false,
            message: "Load generator is not running".into(),
        }));
    }

    // Signal all workers to stop
    state.load_running.store(false, Ordering::SeqCst);

    // Await the run so we know every worker has returned
    let mut guard = state.load_handle.lock().await;
    if let Some(handle) = guard.take() {
        join_load(handle).await;
    }

    Ok(Json(LoadStatus {
        running: false,
        message: "Load generator stopped".into(),
    }))
}

// ─── GET /api/load/status ────────────────────────────────────────

pub async fn load_status(State(state): State<Arc<AppState>>) -> Json<LoadStatus> {
    let running = state.load_running.load(Ordering::SeqCst);
    Json(LoadStatus {
        running,
        message: if running {
            "Load generator running".into()
        } else {
            "Idle".into()
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_load_clean_exit() {
        let handle = tokio::spawn(async {});
        assert!(join_load(handle).await);
    }

    #[tokio::test]
    async fn test_join_load_reports_panicked_run() {
        let handle = tokio::spawn(async { panic!("worker blew up") });
        assert!(!join_load(handle).await);
    }
}
