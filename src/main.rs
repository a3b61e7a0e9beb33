use std::sync::atomic::Ordering;

use clap::Parser;
use scrapehist::config::{Args, ServerConfig};
use scrapehist::handlers::load::spawn_load;
use scrapehist::metrics::new_shared_registry;
use scrapehist::{server, AppState};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Tracing ───────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── 2. Configuration ─────────────────────────────────────────
    let args = Args::parse();
    let config = ServerConfig::from(&args);

    // ── 3. Registry + built-in histograms ────────────────────────
    // Running out of slots here is a misconfiguration: refuse to start.
    let registry = new_shared_registry();
    let state = AppState::new(registry.clone(), config.clone())?;
    info!(
        histograms = registry.len(),
        capacity = registry.capacity(),
        "histogram registry ready"
    );

    // ── 4. Optional synthetic workload ───────────────────────────
    if config.autostart_load {
        config.load.validate().map_err(anyhow::Error::msg)?;
        state.load_running.store(true, Ordering::SeqCst);
        spawn_load(&state, config.load.clone()).await;
        info!(
            workers = config.load.workers,
            duration_secs = config.load.duration_secs,
            "load generator autostarted"
        );
    }

    // ── 5. Router ────────────────────────────────────────────────
    let app = server::create_router(state);

    // ── 6. Bind & serve ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(
        listen = %config.listen_addr,
        scrape_interval_ms = config.scrape_interval.as_millis() as u64,
        "scrapehist listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}
