//! src/chart/shared.rs
//!
//! The chart object shared between the feed thread and the UI thread.
//!
//! Every operation takes the one mutex around buffer and state for the length
//! of its scan, so corrections and snapshots are all-or-nothing with respect
//! to each other. Rendering and file I/O only ever see a snapshot.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use ratatui::style::Color;

use super::config::ChartConfig;
use super::live::{ChartState, LiveChart, Sample, Suspension};

/// Live chart plus the display metadata that travels with it.
#[derive(Debug)]
pub struct ChartShared {
    pub live: LiveChart,
    pub label: String,
    pub color: Color,
    pub y_range: (f64, f64),
}

impl ChartShared {
    pub fn new(cfg: &ChartConfig, color: Color) -> Self {
        Self {
            live: LiveChart::new(cfg),
            label: cfg.label.clone(),
            color,
            y_range: cfg.y_range,
        }
    }
}

/// Point-in-time copy of everything the status panel shows.
#[derive(Clone, Debug)]
pub struct ChartStatus {
    pub state: ChartState,
    pub len: usize,
    pub pressure_scale: u32,
    pub clock_offset: u64,
    pub last_update: Option<Instant>,
}

/// Consistent copy of the chart for rendering or saving.
#[derive(Clone, Debug)]
pub struct ChartSnapshot {
    pub samples: Vec<Sample>,
    pub label: String,
    pub color: Color,
    pub y_range: (f64, f64),
    pub state: ChartState,
}

/// Handle to a chart; clones share the same buffer.
#[derive(Clone, Debug)]
pub struct SharedChart(Arc<Mutex<ChartShared>>);

impl SharedChart {
    pub fn new(cfg: &ChartConfig, color: Color) -> Self {
        Self(Arc::new(Mutex::new(ChartShared::new(cfg, color))))
    }

    /// Every operation leaves the chart consistent, so a panic in another
    /// holder does not invalidate the data.
    fn lock(&self) -> MutexGuard<'_, ChartShared> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with the lock held.
    pub fn with<R>(&self, f: impl FnOnce(&mut ChartShared) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn clear(&self) {
        self.lock().live.clear();
    }

    pub fn pause(&self) {
        self.lock().live.pause();
    }

    pub fn on_tap(&self) {
        self.lock().live.on_tap();
    }

    pub fn suspend(&self) -> Suspension {
        self.lock().live.suspend()
    }

    pub fn resume(&self, suspension: Suspension) {
        self.lock().live.resume(suspension);
    }

    pub fn epoch(&self) -> u64 {
        self.lock().live.epoch()
    }

    pub fn snapshot(&self) -> ChartSnapshot {
        let g = self.lock();
        ChartSnapshot {
            samples: g.live.snapshot(),
            label: g.label.clone(),
            color: g.color,
            y_range: g.y_range,
            state: g.live.state(),
        }
    }

    pub fn status(&self) -> ChartStatus {
        let g = self.lock();
        ChartStatus {
            state: g.live.state(),
            len: g.live.len(),
            pressure_scale: g.live.pressure_scale(),
            clock_offset: g.live.clock_offset(),
            last_update: g.live.last_update(),
        }
    }
}

/// Single-call shortcuts for tests.
#[cfg(test)]
impl SharedChart {
    pub fn append(&self, sample: Sample) -> bool {
        self.lock().live.append(sample)
    }

    pub fn state(&self) -> ChartState {
        self.lock().live.state()
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.lock().live.snapshot()
    }
}
