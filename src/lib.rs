pub mod config;
pub mod error;
pub mod handlers;
pub mod load_generator;
pub mod metrics;
pub mod middleware;
pub mod server;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use config::ServerConfig;
use error::RegistryError;
use load_generator::RelayHistograms;
use metrics::{Handle, SharedHistogramRegistry};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// The histogram engine. Handlers and workers observe, scrapes export.
    pub registry: SharedHistogramRegistry,

    /// Per-request latency (μs), recorded by the timing middleware.
    pub http_request: Handle,

    /// Handles the synthetic relay workload records into.
    pub relay: RelayHistograms,

    pub config: ServerConfig,

    /// Flag checked by every load-generator worker between batches.
    pub load_running: Arc<AtomicBool>,

    /// Handle to the spawned load-generator task so we can await clean shutdown.
    pub load_handle: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl AppState {
    /// Register the built-in histograms and build the state.
    ///
    /// Fails only when `registry` has no room left for them, which is a
    /// startup error.
    pub fn new(
        registry: SharedHistogramRegistry,
        config: ServerConfig,
    ) -> Result<Arc<Self>, RegistryError> {
        let http_request = registry.register("http_request_us", false)?;
        let relay = RelayHistograms::register(&registry)?;

        Ok(Arc::new(Self {
            registry,
            http_request,
            relay,
            config,
            load_running: Arc::new(AtomicBool::new(false)),
            load_handle: tokio::sync::Mutex::new(None),
        }))
    }
}
