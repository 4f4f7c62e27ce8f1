//! Client library for the solar generation prediction service.
//!
//! The crate is organized along explicit module boundaries:
//! - `models` – request/response value records and derived-data helpers
//! - `format` / `calculate` – pure display and sizing helpers
//! - `api` – the typed HTTP client and its single error shape
//! - `geolocation` – device position lookup with timeout fallback
//! - `sequence` – latest-request-wins bookkeeping for live views
//! - `report` – plain-text rendering used by the `solarcast` binary
//! - `config` – environment-driven defaults
//!
//! Everything a caller needs is re-exported here so modules do not have to
//! know about each other's file layout.

pub mod api;
pub mod calculate;
pub mod config;
pub mod format;
pub mod geolocation;
pub mod models;
pub mod report;
pub mod sequence;

pub use api::{ApiClient, ServiceRequestError, DEFAULT_API_URL};
pub use calculate::calculate_system_kwp;
pub use config::Config;
pub use geolocation::{
    FixedPosition, LocationError, NoGeolocation, Position, PositionError, PositionErrorCode,
    PositionOptions, PositionProvider, ReverseGeocoder,
};
pub use models::{
    CurrentLocationResponse, DailyPredictRequest, DailyPredictionResponse, ForecastResponse,
    HealthResponse, HourlyPrediction, Location, LocationQuery, PredictRequest, PredictionDay,
    PredictionResponse, SystemConfig, TotalMismatch, Weather, WeatherResponse,
};
pub use sequence::{RequestSequencer, RequestTicket};
