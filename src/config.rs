//! Server and workload configuration.

use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

/// scrapehist command line arguments.
#[derive(Debug, Parser)]
#[command(name = "scrapehist")]
#[command(about = "In-process histogram engine with an HTTP scrape endpoint")]
pub struct Args {
    /// Address to listen on for HTTP requests.
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    pub listen: String,

    /// Interval (ms) between scrapes pushed on the SSE stream.
    #[arg(long, default_value_t = 1_000)]
    pub scrape_interval_ms: u64,

    /// Start the synthetic workload as soon as the server is up.
    #[arg(long)]
    pub autostart_load: bool,

    /// Worker threads for the synthetic workload.
    #[arg(long, default_value_t = default_workers())]
    pub workers: u32,

    /// How long the synthetic workload runs (seconds).
    #[arg(long, default_value_t = default_duration())]
    pub duration_secs: u64,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on for HTTP requests.
    pub listen_addr: String,
    /// Period of the SSE scrape stream.
    pub scrape_interval: Duration,
    /// Whether to start the workload at boot.
    pub autostart_load: bool,
    /// Workload used by `--autostart-load`.
    pub load: LoadConfig,
}

impl From<&Args> for ServerConfig {
    fn from(args: &Args) -> Self {
        Self {
            listen_addr: args.listen.clone(),
            // a zero period would make the SSE interval panic
            scrape_interval: Duration::from_millis(args.scrape_interval_ms.max(1)),
            autostart_load: args.autostart_load,
            load: LoadConfig {
                workers: args.workers,
                duration_secs: args.duration_secs,
                ..LoadConfig::default()
            },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            scrape_interval: Duration::from_secs(1),
            autostart_load: false,
            load: LoadConfig::default(),
        }
    }
}

/// Synthetic relay workload parameters, as posted to `/api/load/start`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadConfig {
    /// Number of worker threads recording observations
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// How long the workload runs (seconds)
    #[serde(default = "default_duration")]
    pub duration_secs: u64,

    /// Percentage of simulated operations that are gets (0–100)
    #[serde(default = "default_read_pct")]
    pub read_pct: u8,

    /// Largest simulated value size in bytes
    #[serde(default = "default_max_value_bytes")]
    pub max_value_bytes: u32,
}

impl LoadConfig {
    pub const MAX_WORKERS: u32 = 256;
    pub const MAX_DURATION_SECS: u64 = 3_600;

    /// Reject out-of-range parameters with a human readable reason.
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 || self.workers > Self::MAX_WORKERS {
            return Err(format!("workers must be between 1 and {}", Self::MAX_WORKERS));
        }
        if self.duration_secs == 0 || self.duration_secs > Self::MAX_DURATION_SECS {
            return Err(format!(
                "duration_secs must be between 1 and {}",
                Self::MAX_DURATION_SECS
            ));
        }
        if self.read_pct > 100 {
            return Err("read_pct must be between 0 and 100".into());
        }
        if self.max_value_bytes == 0 {
            return Err("max_value_bytes must be positive".into());
        }
        Ok(())
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            duration_secs: default_duration(),
            read_pct: default_read_pct(),
            max_value_bytes: default_max_value_bytes(),
        }
    }
}

fn default_workers() -> u32 {
    4
}
fn default_duration() -> u64 {
    30
}
fn default_read_pct() -> u8 {
    80
}
fn default_max_value_bytes() -> u32 {
    64 * 1024
}
