//! Configuration loader for the `sensor-registry` binary.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller), so `env::var` calls are not scattered through the
//! codebase.
//!
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::storage::DEFAULT_QUOTA_BYTES;

/// Parse an optional environment variable as `$ty`, falling back to a default.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Path of the JSON key-value store file.
    pub store_path: PathBuf,

    /// Maximum size of the store in bytes.
    pub store_quota_bytes: usize,

    /// Period between simulated readings.
    pub sim_interval: Duration,

    /// Stop the simulation after this many readings (0 = until Ctrl-C).
    pub sim_max_emissions: u32,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `SENSOR_APP_STORE` – store file path (default: `sensor-app-store.json`)
/// - `STORE_QUOTA_BYTES` – store size limit (default: 5 MiB)
/// - `SIM_INTERVAL_MS` – simulation period (default: 3000)
/// - `SIM_MAX_EMISSIONS` – readings per simulation run (default: 0, unlimited)
///
/// Returns an error if any variable is set but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let store_path = env::var("SENSOR_APP_STORE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("sensor-app-store.json"));
    let store_quota_bytes = parse_env!("STORE_QUOTA_BYTES", usize, DEFAULT_QUOTA_BYTES);
    let sim_interval_ms = parse_env!("SIM_INTERVAL_MS", u64, 3000);
    let sim_max_emissions = parse_env!("SIM_MAX_EMISSIONS", u32, 0);

    if sim_interval_ms == 0 {
        return Err(anyhow!("SIM_INTERVAL_MS must be greater than zero"));
    }

    Ok(Config {
        store_path,
        store_quota_bytes,
        sim_interval: Duration::from_millis(sim_interval_ms),
        sim_max_emissions,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  SENSOR_APP_STORE  : {}", self.store_path.display());
        tracing::info!("  STORE_QUOTA_BYTES : {}", self.store_quota_bytes);
        tracing::info!("  SIM_INTERVAL_MS   : {}", self.sim_interval.as_millis());
        tracing::info!("  SIM_MAX_EMISSIONS : {}", self.sim_max_emissions);
    }
}
