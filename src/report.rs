//! Plain-text rendering of service responses for the terminal.

use crate::format::{
    format_hour, format_kwh, format_percentage, format_temperature, format_wind_speed,
    weather_icon,
};
use crate::models::{
    DailyPredictionResponse, ForecastResponse, HealthResponse, HourlyPrediction, Location,
    PredictionDay, PredictionResponse, SystemConfig, Weather, WeatherResponse,
};

/// Width of a full (100%) bar in the hourly chart, in characters.
pub const BAR_WIDTH: usize = 40;

// ---

/// Bar for one chart row, `width` characters wide at 100%.
pub fn render_bar(percentage: f64, width: usize) -> String {
    // ---
    let filled = ((percentage.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// `"15 panels × 330W = 4.95 kWp"`
pub fn render_system(system: &SystemConfig) -> String {
    format!(
        "{} panels × {}W = {:.2} kWp",
        system.num_panels,
        system.panel_rating_w,
        system.capacity_kwp()
    )
}

/// `"11:00 - 2.500 kWh (Elevation: 61.3°)"`
pub fn render_peak(peak: &HourlyPrediction) -> String {
    format!(
        "{} - {} (Elevation: {:.1}°)",
        format_hour(peak.hour),
        format_kwh(peak.generation_kwh),
        peak.solar_elevation
    )
}

/// Name and country when known, otherwise the coordinates.
pub fn location_label(location: &Location) -> String {
    // ---
    match (&location.name, &location.country) {
        (Some(name), Some(country)) => format!("{}, {}", name, country),
        (Some(name), None) => name.clone(),
        _ => format!("{:.4}, {:.4}", location.lat, location.lon),
    }
}

pub fn render_daily(daily: &DailyPredictionResponse, day: PredictionDay) -> String {
    // ---
    let mut lines = vec![
        format!("{} ({})", day.label(), daily.date),
        format!("Location : {}", location_label(&daily.location)),
        format!("System   : {}", render_system(&daily.system)),
        format!("Total    : {}", format_kwh(daily.total_kwh)),
        String::new(),
        "Hourly Breakdown".to_string(),
    ];

    let bars = daily.hourly_bars();
    if bars.is_empty() {
        lines.push("  no generation expected".to_string());
    }
    for bar in &bars {
        lines.push(format!(
            "  {}  {}  {:.3} kWh",
            format_hour(bar.hour),
            render_bar(bar.percentage, BAR_WIDTH),
            bar.generation_kwh
        ));
    }

    if let Some(peak) = daily.peak_hour() {
        lines.push(String::new());
        lines.push(format!("Peak Generation: {}", render_peak(peak)));
    }

    lines.join("\n")
}

fn render_conditions(weather: &Weather) -> String {
    // ---
    let description = weather.description.as_deref().unwrap_or("N/A");
    let mut line = format!(
        "{} {}  {}  humidity {}  wind {} @ {:.0}°",
        weather_icon(description),
        description,
        format_temperature(weather.air_temperature),
        format_percentage(weather.relative_humidity),
        format_wind_speed(weather.wind_speed),
        weather.wind_direction
    );
    if let Some(clouds) = weather.clouds {
        line.push_str(&format!("  clouds {}", format_percentage(clouds)));
    }
    line
}

pub fn render_weather(response: &WeatherResponse) -> String {
    // ---
    format!(
        "{}\n{}",
        location_label(&response.location),
        render_conditions(&response.weather)
    )
}

pub fn render_forecast(response: &ForecastResponse) -> String {
    // ---
    let mut lines = vec![location_label(&response.location)];
    lines.extend(
        response
            .forecasts
            .iter()
            .map(|f| format!("{}  {}", f.timestamp, render_conditions(&f.weather))),
    );
    lines.join("\n")
}

pub fn render_prediction(response: &PredictionResponse) -> String {
    // ---
    [
        format!("Location   : {}", location_label(&response.location)),
        format!("System     : {}", render_system(&response.system)),
        format!("Weather    : {}", render_conditions(&response.weather)),
        format!("Timestamp  : {}", response.prediction.timestamp),
        format!(
            "Generation : {} ({})",
            format_kwh(response.prediction.generation_kwh),
            response.prediction.method
        ),
    ]
    .join("\n")
}

pub fn render_health(health: &HealthResponse) -> String {
    // ---
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    format!(
        "status: {}\nmodel loaded: {}\nweather provider configured: {}",
        health.status,
        yes_no(health.model_loaded),
        yes_no(health.openweather_configured)
    )
}
