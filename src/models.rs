//! Data models for the solar prediction service.
//!
//! Every type here is a transient value record: built for one request or
//! decoded from one response, never mutated in place. Field names follow the
//! backend's JSON contract (snake_case, except the feature vector).

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculate::calculate_system_kwp;

// ---

/// A geographic point, optionally named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    // ---
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Free-text geocoding resolves straight to a [`Location`].
pub type GeocodeResponse = Location;

/// Instantaneous weather, as used for a prediction input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    // ---
    /// °C
    pub air_temperature: f64,
    /// %
    pub relative_humidity: f64,
    /// m/s
    pub wind_speed: f64,
    /// degrees
    pub wind_direction: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dew_point: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Cloud cover, %
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clouds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherForecast {
    // ---
    pub timestamp: String,
    #[serde(flatten)]
    pub weather: Weather,
}

/// Size of a PV installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // ---
    pub num_panels: u32,
    pub panel_rating_w: f64,
    pub inverter_kw: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwp: Option<f64>,
}

impl SystemConfig {
    // ---
    /// Build a configuration with `kwp` derived from the panel fields.
    pub fn new(num_panels: u32, panel_rating_w: f64, inverter_kw: f64) -> Self {
        // ---
        Self {
            num_panels,
            panel_rating_w,
            inverter_kw,
            kwp: Some(calculate_system_kwp(num_panels, panel_rating_w)),
        }
    }

    /// Capacity in kWp, recomputed when the backend omitted it.
    pub fn capacity_kwp(&self) -> f64 {
        // ---
        self.kwp
            .unwrap_or_else(|| calculate_system_kwp(self.num_panels, self.panel_rating_w))
    }
}

/// Feature vector the backend fed to its estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PredictionFeatures {
    // ---
    pub air_temperature: f64,
    pub relative_humidity: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    #[serde(rename = "kWp")]
    pub kwp: f64,
    pub number_of_panels: f64,
    #[serde(rename = "TotalInverterKW")]
    pub total_inverter_kw: f64,
    pub hour: f64,
    pub month: f64,
    pub day_of_year: f64,
    pub hour_sin: f64,
    pub hour_cos: f64,
    pub month_sin: f64,
    pub month_cos: f64,
    pub season: f64,
    pub solar_elevation: f64,
    pub temp_deviation: f64,
    pub temp_dew_spread: f64,
    pub humidity_temp: f64,
    pub wind_cooling_effect: f64,
    #[serde(rename = "AvgPanelKW")]
    pub avg_panel_kw: f64,
    pub inverter_panel_ratio: f64,
}

/// How the backend produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionMethod {
    // ---
    /// Trained model
    MlModel,
    /// Heuristic fallback used when no model is loaded
    SimpleEstimation,
}

impl fmt::Display for PredictionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MlModel => write!(f, "ML model"),
            Self::SimpleEstimation => write!(f, "heuristic estimate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    // ---
    pub generation_kwh: f64,
    pub method: PredictionMethod,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    // ---
    pub prediction: PredictionResult,
    pub system: SystemConfig,
    pub weather: Weather,
    pub location: Location,
    pub features: PredictionFeatures,
}

/// Generation estimate for one hour of a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPrediction {
    // ---
    /// Hour of day, 0-23
    pub hour: u8,
    pub generation_kwh: f64,
    /// Degrees above the horizon, negative at night
    pub solar_elevation: f64,
}

/// One bar of the hourly breakdown chart.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyBar {
    // ---
    pub hour: u8,
    pub generation_kwh: f64,
    /// Share of the day's maximum hour, 0-100
    pub percentage: f64,
}

/// Hours at or below this output are left off the chart.
pub const CHART_MIN_KWH: f64 = 0.001;

/// Allowed drift between `total_kwh` and the sum of hourly values, per kWh
/// of total once the total exceeds 1 kWh.
pub const TOTAL_TOLERANCE: f64 = 1e-6;

/// A daily total that disagrees with its hourly series.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("daily total {total_kwh} kWh does not match hourly sum {hourly_sum} kWh")]
pub struct TotalMismatch {
    pub total_kwh: f64,
    pub hourly_sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPredictionResponse {
    // ---
    /// `YYYY-MM-DD`
    pub date: String,
    pub hourly: Vec<HourlyPrediction>,
    pub total_kwh: f64,
    pub system: SystemConfig,
    pub location: Location,
}

impl DailyPredictionResponse {
    // ---
    pub fn hourly_sum(&self) -> f64 {
        self.hourly.iter().map(|h| h.generation_kwh).sum()
    }

    /// Check `total_kwh` against the hourly series.
    ///
    /// The tolerance is absolute up to 1 kWh and relative above it.
    pub fn check_consistency(&self) -> Result<(), TotalMismatch> {
        // ---
        let hourly_sum = self.hourly_sum();
        let tolerance = TOTAL_TOLERANCE * self.total_kwh.abs().max(1.0);

        if (self.total_kwh - hourly_sum).abs() <= tolerance {
            Ok(())
        } else {
            Err(TotalMismatch {
                total_kwh: self.total_kwh,
                hourly_sum,
            })
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.check_consistency().is_ok()
    }

    /// Hour with the highest generation.
    ///
    /// Seeded with the first element and replaced only on a strictly greater
    /// value, so the earliest of several equal maxima is returned.
    pub fn peak_hour(&self) -> Option<&HourlyPrediction> {
        // ---
        let (first, rest) = self.hourly.split_first()?;
        Some(rest.iter().fold(first, |max, h| {
            if h.generation_kwh > max.generation_kwh {
                h
            } else {
                max
            }
        }))
    }

    /// Chart rows for every producing hour, scaled against the peak hour.
    pub fn hourly_bars(&self) -> Vec<HourlyBar> {
        // ---
        let max_kwh = self
            .hourly
            .iter()
            .map(|h| h.generation_kwh)
            .fold(f64::NEG_INFINITY, f64::max);

        self.hourly
            .iter()
            .filter(|h| h.generation_kwh > CHART_MIN_KWH)
            .map(|h| HourlyBar {
                hour: h.hour,
                generation_kwh: h.generation_kwh,
                percentage: if max_kwh > 0.0 {
                    h.generation_kwh / max_kwh * 100.0
                } else {
                    0.0
                },
            })
            .collect()
    }
}

/// Best-effort place details for a coordinate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReverseGeocodeResponse {
    // ---
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Device coordinates merged with whatever reverse geocoding could add.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentLocationResponse {
    // ---
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Horizontal accuracy in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl CurrentLocationResponse {
    // ---
    /// Human-readable place label, e.g. `"Lund, Skåne, Sweden"`.
    ///
    /// Falls back to `"lat, lon"` when reverse geocoding supplied nothing.
    pub fn display_name(&self) -> String {
        // ---
        let parts: Vec<&str> = [&self.city, &self.region, &self.country]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            format!("{}, {}", self.lat, self.lon)
        } else {
            parts.join(", ")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResponse {
    // ---
    pub weather: Weather,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    // ---
    pub forecasts: Vec<WeatherForecast>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    // ---
    pub status: String,
    pub model_loaded: bool,
    pub openweather_configured: bool,
}

/// Body the backend returns alongside a non-2xx status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    // ---
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

/// Where to resolve weather or a prediction for: coordinates, place text, or
/// both. Precedence between them is decided by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationQuery {
    // ---
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl LocationQuery {
    // ---
    pub fn from_text(location: impl Into<String>) -> Self {
        // ---
        let location = location.into();
        Self {
            location: (!location.is_empty()).then_some(location),
            ..Self::default()
        }
    }

    pub fn from_coords(lat: f64, lon: f64) -> Self {
        Self {
            lat: Some(lat),
            lon: Some(lon),
            location: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_none() && self.lon.is_none() && self.location_text().is_none()
    }

    fn location_text(&self) -> Option<&str> {
        self.location.as_deref().filter(|l| !l.is_empty())
    }

    /// Query-string pairs, omitting every absent field.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        // ---
        let mut pairs = Vec::with_capacity(3);
        if let Some(lat) = self.lat {
            pairs.push(("lat", lat.to_string()));
        }
        if let Some(lon) = self.lon {
            pairs.push(("lon", lon.to_string()));
        }
        if let Some(location) = self.location_text() {
            pairs.push(("location", location.to_string()));
        }
        pairs
    }
}

/// Body of `POST /predict`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    // ---
    #[serde(flatten)]
    pub target: LocationQuery,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_panels: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_rating_w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverter_kw: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwp: Option<f64>,
    /// Explicit weather, bypassing the backend's weather lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<Weather>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl PredictRequest {
    // ---
    pub fn new(target: LocationQuery) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn with_system(mut self, system: &SystemConfig) -> Self {
        // ---
        self.num_panels = Some(system.num_panels);
        self.panel_rating_w = Some(system.panel_rating_w);
        self.inverter_kw = Some(system.inverter_kw);
        self.kwp = Some(system.capacity_kwp());
        self
    }

    pub fn with_weather(mut self, weather: Weather) -> Self {
        self.weather = Some(weather);
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

/// Body of `POST /predict/daily`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyPredictRequest {
    // ---
    #[serde(flatten)]
    pub target: LocationQuery,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_panels: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_rating_w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverter_kw: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwp: Option<f64>,
    /// `YYYY-MM-DD`; the backend assumes today when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl DailyPredictRequest {
    // ---
    pub fn new(target: LocationQuery) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn with_system(mut self, system: &SystemConfig) -> Self {
        // ---
        self.num_panels = Some(system.num_panels);
        self.panel_rating_w = Some(system.panel_rating_w);
        self.inverter_kw = Some(system.inverter_kw);
        self.kwp = Some(system.capacity_kwp());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date.format("%Y-%m-%d").to_string());
        self
    }
}

/// Day selector for a daily prediction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PredictionDay {
    // ---
    #[default]
    Today,
    Tomorrow,
}

impl PredictionDay {
    // ---
    /// Calendar date this selector points at, relative to `today`.
    pub fn target_date(self, today: NaiveDate) -> NaiveDate {
        // ---
        match self {
            Self::Today => today,
            Self::Tomorrow => today.succ_opt().unwrap_or(today),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Tomorrow => "Tomorrow",
        }
    }
}

impl fmt::Display for PredictionDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for PredictionDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s.to_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "tomorrow" => Ok(Self::Tomorrow),
            _ => Err(format!("Unknown day '{}', expected 'today' or 'tomorrow'", s)),
        }
    }
}
