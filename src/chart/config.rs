//! src/chart/config.rs
//!
//! Configuration values for the live chart.
//!
//! Centralized parameters for buffer bounding, the sensor's default pressure
//! scale, and the chart label written into saved records.

/// Default pressure scale divisor of the SDP31 differential pressure sensor.
pub const DEFAULT_PRESSURE_SCALE: u32 = 60;

/// Label shown on the live chart and written as the first line of records.
pub const DEFAULT_LABEL: &str = "Differential pressure, Pa";

#[derive(Clone, Debug)]
pub struct ChartConfig {
    /// Maximum number of samples kept in the live buffer (oldest dropped first).
    pub keep_last: usize,

    /// Pressure scale assumed before the sensor reports one.
    pub pressure_scale: u32,

    /// Free-text chart description.
    pub label: String,

    /// Y-range to show while the chart has no data.
    pub y_range: (f64, f64),
}

impl ChartConfig {
    /// Create a new `ChartConfig`. `keep_last` is at least one sample.
    pub fn new(keep_last: usize, pressure_scale: u32, label: &str) -> Self {
        Self {
            keep_last: keep_last.max(1),
            pressure_scale,
            label: label.to_string(),
            ..Self::default()
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            keep_last: 2_000,
            pressure_scale: DEFAULT_PRESSURE_SCALE,
            label: DEFAULT_LABEL.to_string(),
            y_range: (-1.0, 1.0),
        }
    }
}
