//! Application entry point for the `solarcast` command-line client.
//!
//! This binary plays the part of the prediction form:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing (to stderr)
//! - Parsing the command line into a location, a system size and a day
//! - Calling the prediction service through `solarcast::ApiClient`
//! - Printing the rendered result, or the service's error message
//!
//! # Environment Variables
//! - `SOLAR_API_URL` (optional) – service base URL (default: `http://localhost:5000/api`)
//! - `SOLAR_NUM_PANELS`, `SOLAR_PANEL_RATING_W`, `SOLAR_INVERTER_KW` (optional) – default system size
//! - `SOLAR_LAT`, `SOLAR_LON`, `SOLAR_ACCURACY_M` (optional) – device position for `--detect`
//! - `SOLAR_LOG_LEVEL` (optional) – log verbosity (default: `warn`)
//! - `SOLAR_SPAN_EVENTS` (optional) – span event mode for tracing
use std::env;

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use clap::Parser;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use solarcast::report;
use solarcast::{
    ApiClient, Config, CurrentLocationResponse, DailyPredictRequest, FixedPosition,
    LocationQuery, NoGeolocation, PositionProvider, PredictRequest, ServiceRequestError,
    SystemConfig,
};

mod cli;

use cli::{Cli, Command, SystemArgs, TargetArgs};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let args = Cli::parse();

    let mut cfg = solarcast::config::load_from_env()?;
    if let Some(api_url) = args.api_url {
        cfg.api_url = api_url;
    }
    cfg.log_config();

    let client = ApiClient::from_config(&cfg);
    tracing::debug!("Using prediction service at {}", client.base_url());

    match args.cmd {
        Command::Daily {
            target,
            system,
            day,
        } => {
            let target = resolve_target(&client, &cfg, &target).await?;
            let system = system_config(&cfg, &system);
            let date = day.target_date(Utc::now().date_naive());

            let request = DailyPredictRequest::new(target)
                .with_system(&system)
                .with_date(date);
            let daily = client
                .predict_daily(&request)
                .await
                .map_err(service_error)?;

            println!("{}", report::render_daily(&daily, day));
        }
        Command::Predict {
            target,
            system,
            timestamp,
        } => {
            let target = resolve_target(&client, &cfg, &target).await?;
            let system = system_config(&cfg, &system);

            let mut request = PredictRequest::new(target).with_system(&system);
            if let Some(timestamp) = timestamp {
                request = request.with_timestamp(timestamp);
            }
            let prediction = client.predict(&request).await.map_err(service_error)?;

            println!("{}", report::render_prediction(&prediction));
        }
        Command::Weather { target } => {
            let target = resolve_target(&client, &cfg, &target).await?;
            let weather = client.get_weather(&target).await.map_err(service_error)?;
            println!("{}", report::render_weather(&weather));
        }
        Command::Forecast { target } => {
            let target = resolve_target(&client, &cfg, &target).await?;
            let forecast = client.get_forecast(&target).await.map_err(service_error)?;
            println!("{}", report::render_forecast(&forecast));
        }
        Command::Geocode { location } => {
            let location = client.geocode(&location).await.map_err(service_error)?;
            println!(
                "{} ({}, {})",
                report::location_label(&location),
                location.lat,
                location.lon
            );
        }
        Command::ReverseGeocode { lat, lon } => {
            let place = client
                .reverse_geocode(lat, lon)
                .await
                .map_err(service_error)?;
            let current = CurrentLocationResponse {
                lat,
                lon,
                city: place.city,
                region: place.region,
                country: place.country,
                country_code: place.country_code,
                timezone: place.timezone,
                accuracy: None,
            };
            println!("{}", current.display_name());
        }
        Command::Locate => {
            let current = detect_location(&client, &cfg).await?;
            println!("📍 {}", current.display_name());
            if let Some(accuracy) = current.accuracy {
                println!("   accuracy ±{:.0} m", accuracy);
            }
        }
        Command::Health => {
            let health = client.health_check().await.map_err(service_error)?;
            println!("{}", report::render_health(&health));
        }
    }

    Ok(())
}

// ---

/// Attach the backend's hint, when it sent one, to the error message.
fn service_error(e: ServiceRequestError) -> anyhow::Error {
    // ---
    match e.hint() {
        Some(hint) => anyhow!("{} (hint: {})", e, hint),
        None => anyhow::Error::new(e),
    }
}

/// Command-line sizing over configured defaults.
fn system_config(cfg: &Config, args: &SystemArgs) -> SystemConfig {
    // ---
    let base = cfg.system();
    SystemConfig::new(
        args.panels.unwrap_or(base.num_panels),
        args.panel_rating.unwrap_or(base.panel_rating_w),
        args.inverter.unwrap_or(base.inverter_kw),
    )
}

async fn detect_location(client: &ApiClient, cfg: &Config) -> Result<CurrentLocationResponse> {
    // ---
    let provider: Box<dyn PositionProvider> = match cfg.position {
        Some(position) => Box::new(FixedPosition::new(position)),
        None => Box::new(NoGeolocation),
    };

    client
        .get_current_location(provider.as_ref())
        .await
        .map_err(service_error)
}

/// Where to ask about: detection, then coordinates, then place text, then
/// the configured position.
async fn resolve_target(
    client: &ApiClient,
    cfg: &Config,
    target: &TargetArgs,
) -> Result<LocationQuery> {
    // ---
    if target.detect {
        let current = detect_location(client, cfg).await?;
        eprintln!("📍 {}", current.display_name());
        return Ok(LocationQuery::from_coords(current.lat, current.lon));
    }

    if let (Some(lat), Some(lon)) = (target.lat, target.lon) {
        return Ok(LocationQuery::from_coords(lat, lon));
    }

    if let Some(location) = target.location.as_deref().map(str::trim) {
        if !location.is_empty() {
            return Ok(LocationQuery::from_text(location));
        }
    }

    match cfg.position {
        Some(p) => Ok(LocationQuery::from_coords(p.latitude, p.longitude)),
        None => bail!("Enter a location with --location, --lat/--lon or --detect"),
    }
}

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Output on stderr so rendered results on stdout stay clean
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `SOLAR_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by `RUST_LOG`, else the `SOLAR_LOG_LEVEL` env var
///
/// This should be called once at startup before any logging or tracing
/// macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("SOLAR_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stderr().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to SOLAR_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("SOLAR_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "warn",
        };
        EnvFilter::new(format!("{level},hyper=warn,reqwest=warn"))
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
