//! Display formatting for energy and weather quantities.
//!
//! Pure helpers shared by the text report and any other front end. None of
//! them allocate more than the returned `String` or touch I/O.

// ---

/// Energy in kWh with three decimals, switching to MWh with two decimals at
/// 1000 kWh and above.
pub fn format_kwh(kwh: f64) -> String {
    // ---
    if kwh >= 1000.0 {
        format!("{:.2} MWh", kwh / 1000.0)
    } else {
        format!("{:.3} kWh", kwh)
    }
}

pub fn format_temperature(celsius: f64) -> String {
    format!("{:.1}°C", celsius)
}

pub fn format_percentage(value: f64) -> String {
    format!("{:.0}%", value)
}

pub fn format_wind_speed(ms: f64) -> String {
    format!("{:.1} m/s", ms)
}

/// Label for an hour-of-day slot, e.g. `07:00`.
pub fn format_hour(hour: u8) -> String {
    format!("{:02}:00", hour)
}

pub const ICON_CLEAR: &str = "☀️";
pub const ICON_CLOUD: &str = "☁️";
pub const ICON_RAIN: &str = "🌧️";
pub const ICON_THUNDER: &str = "⛈️";
pub const ICON_SNOW: &str = "🌨️";
pub const ICON_FOG: &str = "🌫️";
pub const ICON_DEFAULT: &str = "🌤️";

/// Keyword table in priority order; the first entry with a matching keyword
/// wins.
const WEATHER_ICONS: &[(&[&str], &str)] = &[
    (&["clear"], ICON_CLEAR),
    (&["cloud"], ICON_CLOUD),
    (&["rain"], ICON_RAIN),
    (&["thunder"], ICON_THUNDER),
    (&["snow"], ICON_SNOW),
    (&["mist", "fog"], ICON_FOG),
];

/// Pick a representative icon for a free-text weather description.
///
/// Matching is a case-insensitive substring search.
pub fn weather_icon(description: &str) -> &'static str {
    // ---
    let desc = description.to_lowercase();

    WEATHER_ICONS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| desc.contains(k)))
        .map_or(ICON_DEFAULT, |(_, icon)| *icon)
}
