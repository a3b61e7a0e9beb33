use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::config::LoadConfig;
use crate::error::RegistryError;
use crate::metrics::{Handle, HistogramRegistry, SharedHistogramRegistry};

// ─── Simulated relay shape ───────────────────────────────────────

/// Values are split into chunks of this many bytes by the simulated relay
const CHUNK_SIZE: u32 = 1024;

/// Base cost of one backend round-trip (ns)
const BASE_LATENCY_NS: u64 = 40_000;

/// Extra cost per chunk moved (ns)
const PER_CHUNK_NS: u64 = 2_500;

/// How often a worker checks the deadline / stop flag
const CHECK_EVERY: u32 = 1_024;

// ─── Histogram handles ───────────────────────────────────────────

/// Handles for everything a relay in front of a chunked cache records.
#[derive(Debug, Clone, Copy)]
pub struct RelayHistograms {
    pub get_latency: Handle,
    pub set_latency: Handle,
    pub value_bytes: Handle,
    pub chunks: Handle,
}

impl RelayHistograms {
    pub fn register(registry: &HistogramRegistry) -> Result<Self, RegistryError> {
        Ok(Self {
            get_latency: registry.register("relay_get_latency_ns", false)?,
            set_latency: registry.register("relay_set_latency_ns", false)?,
            // sizes and chunk counts are high-volume and only need a thinned window
            value_bytes: registry.register("relay_value_bytes", true)?,
            chunks: registry.register("relay_chunks", true)?,
        })
    }
}

// ─── Public entry point ──────────────────────────────────────────

/// Runs `config.workers` blocking workers that hammer the registry until
/// the deadline or the `running` flag is set to false.
pub async fn run(
    running: Arc<AtomicBool>,
    registry: SharedHistogramRegistry,
    histograms: RelayHistograms,
    config: LoadConfig,
) {
    let deadline = Instant::now() + Duration::from_secs(config.duration_secs);
    let started = Instant::now();

    let mut handles = Vec::with_capacity(config.workers as usize);

    for worker_id in 0..config.workers {
        let running = running.clone();
        let registry = registry.clone();
        let config = config.clone();

        handles.push(tokio::task::spawn_blocking(move || {
            worker(worker_id, &running, &registry, histograms, &config, deadline)
        }));
    }

    // Wait for all workers to finish
    let mut total_ops = 0u64;
    for h in handles {
        total_ops += h.await.unwrap_or(0);
    }

    // Mark the run as finished
    running.store(false, Ordering::SeqCst);

    let secs = started.elapsed().as_secs_f64();
    info!(
        workers = config.workers,
        total_ops,
        ops_per_sec = if secs > 0.0 { total_ops as f64 / secs } else { 0.0 },
        "load generator finished"
    );
}

// ─── Worker loop ─────────────────────────────────────────────────

fn worker(
    id: u32,
    running: &AtomicBool,
    registry: &SharedHistogramRegistry,
    histograms: RelayHistograms,
    config: &LoadConfig,
    deadline: Instant,
) -> u64 {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + id as u64);
    let mut ops = 0u64;

    loop {
        for _ in 0..CHECK_EVERY {
            let op = simulate(&mut rng, config);
            let latency = if op.is_get {
                histograms.get_latency
            } else {
                histograms.set_latency
            };
            registry.observe(latency, op.latency_ns);
            registry.observe(histograms.value_bytes, op.value_bytes);
            registry.observe(histograms.chunks, op.chunks);
        }
        ops += CHECK_EVERY as u64;

        if !running.load(Ordering::Relaxed) || Instant::now() >= deadline {
            return ops;
        }
    }
}

// ─── One simulated relay operation ───────────────────────────────

#[derive(Debug, Clone, Copy)]
struct SimulatedOp {
    is_get: bool,
    value_bytes: u64,
    chunks: u64,
    latency_ns: u64,
}

fn simulate(rng: &mut StdRng, config: &LoadConfig) -> SimulatedOp {
    let is_get = rng.gen_range(0u8..100) < config.read_pct;

    // Skew towards small values: most fit in one chunk, a long tail does not.
    let scale = rng.gen_range(0..=config.max_value_bytes.checked_ilog2().unwrap_or(0));
    let value_bytes = rng.gen_range(1..=(config.max_value_bytes >> scale).max(1)) as u64;
    let chunks = value_bytes.div_ceil(CHUNK_SIZE as u64);

    // Sets write every chunk plus the metadata key; gets read them back.
    let chunk_cost = if is_get { chunks } else { chunks + 1 };
    let jitter = rng.gen_range(0..BASE_LATENCY_NS / 2);
    let latency_ns = BASE_LATENCY_NS + chunk_cost * PER_CHUNK_NS + jitter;

    SimulatedOp {
        is_get,
        value_bytes,
        chunks,
        latency_ns,
    }
}
