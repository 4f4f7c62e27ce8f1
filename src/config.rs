//! Configuration loader for the `solarcast` client.
//!
//! This module centralizes all runtime configuration values and their
//! defaults, loading from environment variables (with optional `.env` file
//! support provided by the caller). Command-line flags override whatever is
//! loaded here.
//!
use std::env;

use anyhow::{anyhow, Result};

use crate::api::DEFAULT_API_URL;
use crate::geolocation::Position;
use crate::models::SystemConfig;

/// Parse an optional environment variable with a default value.
macro_rules! parse_env_or {
    ($lookup:expr, $var_name:expr, $ty:ty, $default:expr) => {
        parse_env_opt!($lookup, $var_name, $ty).unwrap_or($default)
    };
}

/// Parse an optional environment variable, `None` when unset.
macro_rules! parse_env_opt {
    ($lookup:expr, $var_name:expr, $ty:ty) => {
        $lookup($var_name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
    };
}

/// Default system size, matching a typical residential array.
pub const DEFAULT_NUM_PANELS: u32 = 15;
pub const DEFAULT_PANEL_RATING_W: f64 = 330.0;
pub const DEFAULT_INVERTER_KW: f64 = 5.0;

/// Strongly typed client configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // ---
    /// Prediction service base URL, including the `/api` prefix.
    pub api_url: String,

    /// Default number of panels.
    pub num_panels: u32,

    /// Default per-panel rating in watts.
    pub panel_rating_w: f64,

    /// Default inverter capacity in kW.
    pub inverter_kw: f64,

    /// Configured device position for location detection, if any.
    pub position: Option<Position>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            num_panels: DEFAULT_NUM_PANELS,
            panel_rating_w: DEFAULT_PANEL_RATING_W,
            inverter_kw: DEFAULT_INVERTER_KW,
            position: None,
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `SOLAR_API_URL` – service base URL (default: `http://localhost:5000/api`)
/// - `SOLAR_NUM_PANELS` – default panel count (default: 15)
/// - `SOLAR_PANEL_RATING_W` – default panel rating (default: 330)
/// - `SOLAR_INVERTER_KW` – default inverter capacity (default: 5)
/// - `SOLAR_LAT` / `SOLAR_LON` – device position, must be set together
/// - `SOLAR_ACCURACY_M` – accuracy reported with that position
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    load_with(|name| env::var(name).ok())
}

/// Load configuration through an arbitrary variable lookup.
pub fn load_with<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let api_url = lookup("SOLAR_API_URL")
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let num_panels = parse_env_or!(lookup, "SOLAR_NUM_PANELS", u32, DEFAULT_NUM_PANELS);
    let panel_rating_w = parse_env_or!(lookup, "SOLAR_PANEL_RATING_W", f64, DEFAULT_PANEL_RATING_W);
    let inverter_kw = parse_env_or!(lookup, "SOLAR_INVERTER_KW", f64, DEFAULT_INVERTER_KW);

    let lat = parse_env_opt!(lookup, "SOLAR_LAT", f64);
    let lon = parse_env_opt!(lookup, "SOLAR_LON", f64);
    let accuracy = parse_env_opt!(lookup, "SOLAR_ACCURACY_M", f64);

    let position = match (lat, lon) {
        (Some(latitude), Some(longitude)) => Some(Position {
            latitude,
            longitude,
            accuracy,
        }),
        (None, None) => None,
        _ => return Err(anyhow!("SOLAR_LAT and SOLAR_LON must be set together")),
    };

    Ok(Config {
        api_url,
        num_panels,
        panel_rating_w,
        inverter_kw,
        position,
    })
}

impl Config {
    // ---
    /// Default system size from configuration.
    pub fn system(&self) -> SystemConfig {
        SystemConfig::new(self.num_panels, self.panel_rating_w, self.inverter_kw)
    }

    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        let position = self.position.map_or_else(
            || "not set".to_string(),
            |p| format!("{}, {}", p.latitude, p.longitude),
        );

        tracing::info!("Configuration loaded:");
        tracing::info!("  SOLAR_API_URL        : {}", self.api_url);
        tracing::info!("  SOLAR_NUM_PANELS     : {}", self.num_panels);
        tracing::info!("  SOLAR_PANEL_RATING_W : {}", self.panel_rating_w);
        tracing::info!("  SOLAR_INVERTER_KW    : {}", self.inverter_kw);
        tracing::info!("  SOLAR_LAT/SOLAR_LON  : {}", position);
    }
}
