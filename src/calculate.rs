//! Derived system metrics.

// ---

/// Total nameplate capacity of an array in kWp.
///
/// No rounding is applied; display code decides how many decimals to show.
pub fn calculate_system_kwp(num_panels: u32, panel_rating_w: f64) -> f64 {
    // ---
    (f64::from(num_panels) * panel_rating_w) / 1000.0
}
