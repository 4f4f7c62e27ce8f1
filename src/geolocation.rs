//! Device location detection.
//!
//! Wraps a single-shot position capability (a browser, a GPS daemon, or a
//! fixed configured point) in a small state machine:
//!
//! ```text
//! Requesting --ok--------------> Enriching --> Done
//!     |                              ^
//!     +--timeout--> Retrying --ok----+
//!     |                 |
//!     +--other error----+--error---> Failed
//! ```
//!
//! The first attempt asks for a high-accuracy fix. Only a timeout on that
//! attempt triggers the single degraded retry. Enrichment (reverse geocoding)
//! never fails the operation; without it the result carries coordinates and
//! accuracy only.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::ServiceRequestError;
use crate::models::{CurrentLocationResponse, ReverseGeocodeResponse};

pub const MSG_PERMISSION_DENIED: &str =
    "Location permission denied. Please enable location access in your browser settings.";
pub const MSG_POSITION_UNAVAILABLE: &str =
    "Location information unavailable. Please check your device settings.";
pub const MSG_TIMEOUT: &str =
    "Location request timed out. Please try again or enter location manually.";
pub const MSG_UNSUPPORTED: &str = "Geolocation is not supported on this device";
pub const MSG_FALLBACK: &str = "Could not get your location";

// ---

/// Parameters for one position query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    // ---
    pub enable_high_accuracy: bool,
    /// Give up on the fix after this long.
    pub timeout: Duration,
    /// Accept a cached fix no older than this.
    pub maximum_age: Duration,
}

impl PositionOptions {
    // ---
    /// First attempt.
    pub const HIGH_ACCURACY: Self = Self {
        enable_high_accuracy: true,
        timeout: Duration::from_secs(30),
        maximum_age: Duration::from_secs(60),
    };

    /// Retry after the first attempt timed out.
    pub const FALLBACK: Self = Self {
        enable_high_accuracy: false,
        timeout: Duration::from_secs(15),
        maximum_age: Duration::from_secs(300),
    };
}

/// A device fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    // ---
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters, when the source reports one.
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionErrorCode {
    // ---
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    /// The device has no position capability at all.
    Unsupported,
}

impl fmt::Display for PositionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PermissionDenied => "permission denied",
            Self::PositionUnavailable => "position unavailable",
            Self::Timeout => "timeout",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{}", name)
    }
}

/// Raw failure reported by a [`PositionProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {detail}")]
pub struct PositionError {
    pub code: PositionErrorCode,
    pub detail: String,
}

impl PositionError {
    pub fn new(code: PositionErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

/// Terminal failure of location detection, with a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LocationError {
    pub code: PositionErrorCode,
    pub message: &'static str,
}

/// Single-shot position source.
#[async_trait]
pub trait PositionProvider: Send + Sync {
    async fn current_position(&self, options: PositionOptions) -> Result<Position, PositionError>;
}

/// Coordinate → place lookup used to enrich a fix.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse_geocode(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<ReverseGeocodeResponse, ServiceRequestError>;
}

/// Provider that always reports the same configured point.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition {
    position: Position,
}

impl FixedPosition {
    pub fn new(position: Position) -> Self {
        Self { position }
    }
}

#[async_trait]
impl PositionProvider for FixedPosition {
    async fn current_position(&self, _options: PositionOptions) -> Result<Position, PositionError> {
        Ok(self.position)
    }
}

/// Provider for hosts without any position capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

#[async_trait]
impl PositionProvider for NoGeolocation {
    async fn current_position(&self, _options: PositionOptions) -> Result<Position, PositionError> {
        Err(PositionError::new(
            PositionErrorCode::Unsupported,
            "no position source configured",
        ))
    }
}

/// Message for a failed first attempt.
///
/// Has no timeout wording: a first-attempt timeout is retried instead of
/// being mapped, so only [`retry_error`] produces [`MSG_TIMEOUT`].
pub fn first_attempt_error(code: PositionErrorCode) -> LocationError {
    // ---
    let message = match code {
        PositionErrorCode::PermissionDenied => MSG_PERMISSION_DENIED,
        PositionErrorCode::PositionUnavailable => MSG_POSITION_UNAVAILABLE,
        PositionErrorCode::Unsupported => MSG_UNSUPPORTED,
        PositionErrorCode::Timeout => MSG_FALLBACK,
    };
    LocationError { code, message }
}

/// Message for a failed retry.
pub fn retry_error(code: PositionErrorCode) -> LocationError {
    // ---
    let message = match code {
        PositionErrorCode::PermissionDenied => MSG_PERMISSION_DENIED,
        PositionErrorCode::PositionUnavailable => MSG_POSITION_UNAVAILABLE,
        PositionErrorCode::Timeout => MSG_TIMEOUT,
        PositionErrorCode::Unsupported => MSG_UNSUPPORTED,
    };
    LocationError { code, message }
}

/// States of one location-detection run.
#[derive(Debug, Clone, PartialEq)]
pub enum LocateState {
    // ---
    Requesting,
    Retrying,
    Enriching(Position),
    Done(CurrentLocationResponse),
    Failed(LocationError),
}

impl LocateState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }
}

/// Advance one non-terminal state by a single awaited step.
///
/// Terminal states are returned unchanged.
pub async fn step<P, G>(state: LocateState, provider: &P, geocoder: &G) -> LocateState
where
    P: PositionProvider + ?Sized,
    G: ReverseGeocoder + ?Sized,
{
    // ---
    match state {
        LocateState::Requesting => {
            match provider.current_position(PositionOptions::HIGH_ACCURACY).await {
                Ok(position) => LocateState::Enriching(position),
                Err(e) if e.code == PositionErrorCode::Timeout => {
                    debug!("High-accuracy fix timed out, retrying: {}", e);
                    LocateState::Retrying
                }
                Err(e) => {
                    debug!("Position request failed: {}", e);
                    LocateState::Failed(first_attempt_error(e.code))
                }
            }
        }
        LocateState::Retrying => match provider.current_position(PositionOptions::FALLBACK).await {
            Ok(position) => LocateState::Enriching(position),
            Err(e) => {
                debug!("Fallback position request failed: {}", e);
                LocateState::Failed(retry_error(e.code))
            }
        },
        LocateState::Enriching(position) => LocateState::Done(enrich(geocoder, position).await),
        terminal => terminal,
    }
}

/// Run location detection to completion.
pub async fn locate<P, G>(provider: &P, geocoder: &G) -> Result<CurrentLocationResponse, LocationError>
where
    P: PositionProvider + ?Sized,
    G: ReverseGeocoder + ?Sized,
{
    // ---
    let mut state = LocateState::Requesting;
    loop {
        state = match state {
            LocateState::Done(result) => return Ok(result),
            LocateState::Failed(err) => return Err(err),
            pending => step(pending, provider, geocoder).await,
        };
    }
}

async fn enrich<G>(geocoder: &G, position: Position) -> CurrentLocationResponse
where
    G: ReverseGeocoder + ?Sized,
{
    // ---
    let mut result = CurrentLocationResponse {
        lat: position.latitude,
        lon: position.longitude,
        city: None,
        region: None,
        country: None,
        country_code: None,
        timezone: None,
        accuracy: position.accuracy,
    };

    match geocoder
        .reverse_geocode(position.latitude, position.longitude)
        .await
    {
        Ok(place) => {
            result.city = place.city;
            result.region = place.region;
            result.country = place.country;
            result.country_code = place.country_code;
            result.timezone = place.timezone;
        }
        Err(e) => warn!("Reverse geocoding failed: {}", e),
    }
    result
}
