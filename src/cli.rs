use clap::{Args, Parser, Subcommand};
use solarcast::PredictionDay;

#[derive(Debug, Parser)]
#[command(name = "solarcast", about = "Solar generation predictions from the command line.")]
pub struct Cli {
    /// Prediction service base URL (overrides SOLAR_API_URL)
    #[arg(long, global = true, env = "SOLAR_API_URL")]
    pub api_url: Option<String>,
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Hourly generation curve for today or tomorrow
    Daily {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        system: SystemArgs,
        /// today | tomorrow
        #[arg(long, default_value = "today")]
        day: PredictionDay,
    },
    /// Single-instant generation estimate
    Predict {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        system: SystemArgs,
        /// ISO 8601 timestamp, defaults to now on the service side
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Current weather
    Weather {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Weather forecast
    Forecast {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Resolve a place name to coordinates
    Geocode { location: String },
    /// Resolve coordinates to a place name
    ReverseGeocode {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
    },
    /// Detect the device location
    Locate,
    /// Service status
    Health,
}

#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Place name, e.g. "Sydney, Australia"
    #[arg(long, short, conflicts_with_all = ["lat", "detect"])]
    pub location: Option<String>,
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,
    /// Use the detected device location
    #[arg(long, conflicts_with = "lat")]
    pub detect: bool,
}

#[derive(Debug, Args)]
pub struct SystemArgs {
    /// Number of panels (1-1000)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1000))]
    pub panels: Option<u32>,
    /// Rating of one panel in watts
    #[arg(long, value_parser = parse_panel_rating)]
    pub panel_rating: Option<f64>,
    /// Inverter capacity in kW (0.5-100)
    #[arg(long, value_parser = parse_inverter_kw)]
    pub inverter: Option<f64>,
}

fn parse_panel_rating(s: &str) -> Result<f64, String> {
    let watts: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if watts > 0.0 {
        Ok(watts)
    } else {
        Err("panel rating must be positive".to_string())
    }
}

fn parse_inverter_kw(s: &str) -> Result<f64, String> {
    let kw: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if (0.5..=100.0).contains(&kw) {
        Ok(kw)
    } else {
        Err("inverter capacity must be between 0.5 and 100 kW".to_string())
    }
}
