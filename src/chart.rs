//! src/chart.rs
//!
//! Top-level `chart` module exposing configuration, the live buffer and the
//! shared handle.

pub mod config;
pub mod live;
pub mod shared;

/// Re-exports
pub use config::ChartConfig;
pub use live::{ChartState, Sample};
pub use shared::SharedChart;
