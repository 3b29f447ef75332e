//! Greenlight API gateway (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id → trace → metrics → panic boundary → CORS
//!                       → rate limiter → authenticator → route gate → handler
//!     Client Response
//!     ◀────────────── (every stage may answer early with a JSON rejection)
//!
//!     Cross-cutting: config │ observability │ lifecycle (startup/shutdown)
//! ```
//!
//! Configuration comes from an optional TOML file, overridden by flags.

use std::path::PathBuf;

use clap::Parser;

use greenlight_gateway::config::loader::read_config;
use greenlight_gateway::config::validation::validate_config;
use greenlight_gateway::config::{ApiConfig, ConfigError};
use greenlight_gateway::lifecycle::launch;
use greenlight_gateway::observability::logging::init_logging;

#[derive(Parser, Debug)]
#[command(name = "greenlight-gateway")]
#[command(about = "Request pipeline for the Greenlight movie API", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:4000
    #[arg(long)]
    bind: Option<String>,

    /// Environment (development|staging|production)
    #[arg(long)]
    env: Option<String>,

    /// Enable the per-client rate limiter
    #[arg(long)]
    limiter_enabled: Option<bool>,

    /// Rate limiter maximum requests per second
    #[arg(long)]
    limiter_rps: Option<f64>,

    /// Rate limiter maximum burst
    #[arg(long)]
    limiter_burst: Option<u32>,

    /// Trusted CORS origins (space separated)
    #[arg(long, value_delimiter = ' ', num_args = 1..)]
    cors_trusted_origins: Option<Vec<String>>,

    /// Seconds in-flight requests get to finish on shutdown
    #[arg(long)]
    shutdown_grace_secs: Option<u64>,
}

impl Cli {
    fn apply(self, config: &mut ApiConfig) {
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(env) = self.env {
            config.env = env;
        }
        if let Some(enabled) = self.limiter_enabled {
            config.rate_limit.enabled = enabled;
        }
        if let Some(rps) = self.limiter_rps {
            config.rate_limit.requests_per_second = rps;
        }
        if let Some(burst) = self.limiter_burst {
            config.rate_limit.burst_size = burst;
        }
        if let Some(origins) = self.cors_trusted_origins {
            config.cors.trusted_origins = origins.into_iter().filter(|o| !o.is_empty()).collect();
        }
        if let Some(grace) = self.shutdown_grace_secs {
            config.timeouts.shutdown_grace_secs = grace;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ApiConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        env = %config.env,
        "Configuration loaded"
    );

    launch(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
