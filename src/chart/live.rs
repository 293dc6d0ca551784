//! src/chart/live.rs
//!
//! Live sample buffer and its Cleared / Active / Inactive lifecycle.
//!
//! Clock and pressure-scale corrections are applied retroactively to every
//! buffered sample. Nothing in here locks: `shared.rs` wraps a `LiveChart`
//! in the mutex that both the feed thread and the UI go through.

use std::collections::VecDeque;
use std::time::Instant;

use log::{debug, warn};

use super::config::ChartConfig;

/// One (time, value) measurement. `x` is chart time in seconds, `y` is the
/// measured value in sensor units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// The `(x, y)` tuple form the chart widget takes.
    pub fn point(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartState {
    /// Waiting for sensor data.
    Cleared,
    /// Actively displaying data.
    Active,
    /// Paused.
    Inactive,
}

impl ChartState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartState::Cleared => "cleared",
            ChartState::Active => "active",
            ChartState::Inactive => "paused",
        }
    }
}

/// Returned by [`LiveChart::suspend`]; remembers whether the chart was live
/// when the user navigated away from it.
#[derive(Clone, Copy, Debug)]
#[must_use]
pub struct Suspension {
    was_active: bool,
}

#[derive(Debug)]
pub struct LiveChart {
    /// buffered samples, ordered by `x` (oldest at front)
    samples: VecDeque<Sample>,
    state: ChartState,

    /// current sensor range divisor
    pressure_scale: u32,

    /// last seen device clock tick, microseconds
    clock_offset: u64,

    last_update: Option<Instant>,

    /// bumped on every clear so per-session counters elsewhere can reset
    epoch: u64,

    keep_last: usize,
}

impl LiveChart {
    pub fn new(config: &ChartConfig) -> Self {
        Self {
            samples: VecDeque::new(),
            state: ChartState::Cleared,
            pressure_scale: config.pressure_scale,
            clock_offset: 0,
            last_update: None,
            epoch: 0,
            keep_last: config.keep_last.max(1),
        }
    }

    /// Accept one sample from the feed.
    ///
    /// Dropped while paused or when not finite. The first sample after a clear
    /// makes the chart active. Returns whether the sample was buffered.
    pub fn append(&mut self, sample: Sample) -> bool {
        if !sample.is_finite() {
            debug!("dropping non-finite sample {:?}", sample);
            return false;
        }
        match self.state {
            ChartState::Inactive => return false,
            ChartState::Cleared => {
                debug!("first sample since clear, chart is live");
                self.state = ChartState::Active;
            }
            ChartState::Active => {}
        }

        let at = match self.samples.back() {
            Some(last) if sample.x < last.x => {
                debug!("out-of-order sample x={} (last x={})", sample.x, last.x);
                self.samples.partition_point(|s| s.x <= sample.x)
            }
            _ => self.samples.len(),
        };
        self.samples.insert(at, sample);

        while self.samples.len() > self.keep_last {
            self.samples.pop_front();
        }
        self.last_update = Some(Instant::now());
        true
    }

    /// Adjust the estimated time shift with the device clock.
    ///
    /// `tick_us` is the absolute device time in microseconds. Buffered samples
    /// are shifted only while the chart is not paused; the tick is always
    /// remembered so the next delta is measured from it.
    pub fn sync_clock(&mut self, tick_us: u64) {
        if tick_us == self.clock_offset {
            return;
        }
        let delay = (tick_us as f64 - self.clock_offset as f64) / 1e6;
        if self.state != ChartState::Inactive {
            for s in self.samples.iter_mut() {
                s.x += delay;
            }
        }
        self.clock_offset = tick_us;
    }

    /// Rescale buffered values to a new pressure scale, even while paused.
    pub fn rescale_y(&mut self, scale: u32) {
        if scale == self.pressure_scale {
            return;
        }
        if scale == 0 {
            warn!("ignoring zero pressure scale");
            return;
        }
        let factor = self.pressure_scale as f64 / scale as f64;
        for s in self.samples.iter_mut() {
            s.y *= factor;
        }
        debug!("pressure scale {} -> {}", self.pressure_scale, scale);
        self.pressure_scale = scale;
    }

    /// Drop all samples and wait for new data. Scale and clock survive.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.last_update = Some(Instant::now());
        self.state = ChartState::Cleared;
        self.epoch = self.epoch.wrapping_add(1);
    }

    pub fn pause(&mut self) {
        self.state = ChartState::Inactive;
    }

    /// Single-tap cycle: active pauses, paused clears, cleared ignores.
    pub fn on_tap(&mut self) {
        match self.state {
            ChartState::Cleared => {}
            ChartState::Inactive => self.clear(),
            ChartState::Active => self.pause(),
        }
    }

    /// Pause for navigation away from the chart.
    pub fn suspend(&mut self) -> Suspension {
        let was_active = self.is_active();
        self.pause();
        Suspension { was_active }
    }

    /// Coming back: a chart that was live when left starts over, a chart the
    /// user had paused stays paused.
    pub fn resume(&mut self, suspension: Suspension) {
        if suspension.was_active {
            self.clear();
        }
    }

    /// Either cleared or active.
    pub fn is_active(&self) -> bool {
        self.state != ChartState::Inactive
    }

    pub fn state(&self) -> ChartState {
        self.state
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn pressure_scale(&self) -> u32 {
        self.pressure_scale
    }

    pub fn clock_offset(&self) -> u64 {
        self.clock_offset
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart() -> LiveChart {
        LiveChart::new(&ChartConfig::default())
    }

    fn active_with(points: &[(f64, f64)]) -> LiveChart {
        let mut c = chart();
        for &(x, y) in points {
            assert!(c.append(Sample::new(x, y)));
        }
        c
    }

    fn xs(c: &LiveChart) -> Vec<f64> {
        c.snapshot().iter().map(|s| s.x).collect()
    }

    fn ys(c: &LiveChart) -> Vec<f64> {
        c.snapshot().iter().map(|s| s.y).collect()
    }

    #[test]
    fn first_sample_activates_cleared_chart() {
        let mut c = chart();
        assert_eq!(c.state(), ChartState::Cleared);
        assert!(c.append(Sample::new(0.0, 1.0)));
        assert_eq!(c.state(), ChartState::Active);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn snapshot_keeps_arrival_order() {
        let pts = [(0.0, 1.0), (0.5, -2.0), (1.0, 3.5), (1.5, 0.25)];
        let c = active_with(&pts);
        let got: Vec<_> = c.snapshot().iter().map(Sample::point).collect();
        assert_eq!(got, pts.to_vec());
    }

    #[test]
    fn out_of_order_sample_is_placed_by_time() {
        let mut c = active_with(&[(0.0, 1.0), (2.0, 2.0)]);
        c.append(Sample::new(1.0, 9.0));
        c.append(Sample::new(2.0, 7.0));
        assert_eq!(xs(&c), vec![0.0, 1.0, 2.0, 2.0]);
        assert_eq!(ys(&c), vec![1.0, 9.0, 2.0, 7.0]);
    }

    #[test]
    fn non_finite_samples_are_dropped() {
        let mut c = chart();
        assert!(!c.append(Sample::new(f64::NAN, 1.0)));
        assert!(!c.append(Sample::new(0.0, f64::INFINITY)));
        assert_eq!(c.len(), 0);
        assert_eq!(c.state(), ChartState::Cleared);
    }

    #[test]
    fn paused_chart_drops_samples() {
        let mut c = active_with(&[(0.0, 1.0)]);
        c.pause();
        assert!(!c.append(Sample::new(1.0, 2.0)));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn buffer_is_bounded_by_keep_last() {
        let mut c = LiveChart::new(&ChartConfig::new(3, 60, "t"));
        for i in 0..5 {
            c.append(Sample::new(i as f64, 0.0));
        }
        assert_eq!(xs(&c), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn clock_sync_shifts_buffered_times() {
        let mut c = active_with(&[(0.0, 1.0), (1.0, 1.0)]);
        c.sync_clock(500_000);
        assert_eq!(xs(&c), vec![0.5, 1.5]);
        c.sync_clock(250_000);
        assert_eq!(xs(&c), vec![0.25, 1.25]);
        assert_eq!(c.clock_offset(), 250_000);
    }

    #[test]
    fn clock_sync_is_idempotent() {
        let mut once = active_with(&[(0.0, 1.0), (1.0, 2.0)]);
        let mut twice = active_with(&[(0.0, 1.0), (1.0, 2.0)]);
        once.sync_clock(3_000_000);
        twice.sync_clock(3_000_000);
        twice.sync_clock(3_000_000);
        assert_eq!(once.snapshot(), twice.snapshot());
    }

    #[test]
    fn corrections_accumulate_only_for_earlier_samples() {
        let mut c = active_with(&[(0.0, 10.0)]);
        c.sync_clock(1_000_000);
        c.append(Sample::new(2.0, 10.0));
        c.rescale_y(30);
        assert_eq!(xs(&c), vec![1.0, 2.0]);
        assert_eq!(ys(&c), vec![20.0, 20.0]);
    }

    #[test]
    fn rescale_to_same_scale_is_noop() {
        let mut c = active_with(&[(0.0, 1.5), (1.0, -3.0)]);
        let before = c.snapshot();
        c.rescale_y(60);
        assert_eq!(c.snapshot(), before);
    }

    #[test]
    fn rescale_to_half_doubles_values() {
        let mut c = active_with(&[(0.0, 1.5), (1.0, -3.0)]);
        c.rescale_y(30);
        assert_eq!(ys(&c), vec![3.0, -6.0]);
        assert_eq!(c.pressure_scale(), 30);
    }

    #[test]
    fn zero_scale_is_ignored() {
        let mut c = active_with(&[(0.0, 1.5)]);
        c.rescale_y(0);
        assert_eq!(ys(&c), vec![1.5]);
        assert_eq!(c.pressure_scale(), 60);
    }

    #[test]
    fn paused_chart_rescales_but_keeps_times() {
        let mut c = active_with(&[(0.0, 1.0), (1.0, 2.0)]);
        c.pause();
        c.sync_clock(2_000_000);
        c.rescale_y(120);
        assert_eq!(xs(&c), vec![0.0, 1.0]);
        assert_eq!(ys(&c), vec![0.5, 1.0]);
        assert_eq!(c.clock_offset(), 2_000_000);

        // the delta after a pause is measured from the tick seen while paused
        c.clear();
        c.append(Sample::new(0.0, 1.0));
        c.sync_clock(2_500_000);
        assert_eq!(xs(&c), vec![0.5]);
    }

    #[test]
    fn taps_on_cleared_chart_do_nothing() {
        let mut c = chart();
        for _ in 0..5 {
            c.on_tap();
            assert_eq!(c.state(), ChartState::Cleared);
            assert_eq!(c.len(), 0);
        }
    }

    #[test]
    fn tap_cycle_pauses_then_clears() {
        let mut c = active_with(&[(0.0, 1.0), (1.0, 2.0)]);
        let epoch = c.epoch();

        c.on_tap();
        assert_eq!(c.state(), ChartState::Inactive);
        let frozen = c.snapshot();
        c.append(Sample::new(2.0, 3.0));
        assert_eq!(c.snapshot(), frozen);

        c.on_tap();
        assert_eq!(c.state(), ChartState::Cleared);
        assert_eq!(c.len(), 0);
        assert_eq!(c.epoch(), epoch + 1);
        assert!(c.last_update().is_some());
    }

    #[test]
    fn clear_keeps_scale_and_clock() {
        let mut c = active_with(&[(0.0, 1.0)]);
        c.rescale_y(30);
        c.sync_clock(42);
        c.clear();
        assert_eq!(c.pressure_scale(), 30);
        assert_eq!(c.clock_offset(), 42);
    }

    #[test]
    fn resume_clears_chart_that_was_live() {
        let mut c = active_with(&[(0.0, 1.0)]);
        let s = c.suspend();
        assert_eq!(c.state(), ChartState::Inactive);
        assert!(!c.append(Sample::new(1.0, 1.0)));
        c.resume(s);
        assert_eq!(c.state(), ChartState::Cleared);
        assert_eq!(c.len(), 0);
    }

    #[test]
    fn resume_keeps_chart_the_user_paused() {
        let mut c = active_with(&[(0.0, 1.0)]);
        c.pause();
        let s = c.suspend();
        c.resume(s);
        assert_eq!(c.state(), ChartState::Inactive);
        assert_eq!(c.len(), 1);
    }
}
