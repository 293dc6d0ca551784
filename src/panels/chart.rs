//! src/panels/chart.rs
//!
//! Chart panel: draws one sample series with padded y-bounds.
//!
//! The panel owns a copy of the samples it draws; the live chart's lock is
//! released before rendering starts.

use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
};

use crate::chart::shared::ChartSnapshot;
use crate::record::SavedChart;

const NO_DATA: &str = "Waiting for sensor data...";

pub struct ChartPanel {
    pub title: String,
    pub series: Vec<(f64, f64)>,
    pub color: Color,
    /// y-range used while there is nothing to fit
    pub y_range: (f64, f64),
}

impl ChartPanel {
    /// Live chart; the title carries the label and the chart state.
    pub fn live(snap: &ChartSnapshot) -> Self {
        Self {
            title: format!("{} [{}]", snap.label, snap.state.as_str()),
            series: snap.samples.iter().map(|s| s.point()).collect(),
            color: snap.color,
            y_range: snap.y_range,
        }
    }

    /// A record loaded from disk.
    pub fn saved(chart: &SavedChart) -> Self {
        let title = if chart.label.is_empty() {
            chart.name.clone()
        } else {
            format!("{} ({})", chart.name, chart.label)
        };
        Self {
            title,
            series: chart.samples.iter().map(|s| s.point()).collect(),
            color: Color::Yellow,
            y_range: (-1.0, 1.0),
        }
    }

    /// Target (ymin, ymax) for the data, with padding.
    ///
    /// Flat data gets magnitude-based padding so the line stays visible;
    /// otherwise 10% of the range is added on each side.
    fn y_bounds(series: &[(f64, f64)], fallback: (f64, f64)) -> (f64, f64) {
        let mut mn = f64::INFINITY;
        let mut mx = f64::NEG_INFINITY;
        for &(_, y) in series {
            mn = mn.min(y);
            mx = mx.max(y);
        }
        if !mn.is_finite() || !mx.is_finite() {
            return fallback;
        }
        if (mx - mn).abs() < f64::EPSILON {
            let pad = mn.abs().max(1.0) * 0.1;
            (mn - pad, mx + pad)
        } else {
            let pad = (mx - mn) * 0.1;
            (mn - pad, mx + pad)
        }
    }

    /// Series is ordered by x, so the ends are the bounds.
    fn x_bounds(series: &[(f64, f64)]) -> (f64, f64) {
        match (series.first(), series.last()) {
            (Some(&(first, _)), Some(&(last, _))) if last > first => (first, last),
            (Some(&(first, _)), _) => (first - 0.5, first + 0.5),
            _ => (0.0, 1.0),
        }
    }

    fn labels(lo: f64, hi: f64, n: usize, precision: usize) -> Vec<String> {
        let span = (hi - lo).max(1e-9);
        (0..n)
            .map(|i| format!("{:.*}", precision, lo + span * i as f64 / (n - 1) as f64))
            .collect()
    }
}

impl crate::ui::Panel for ChartPanel {
    fn draw(&self, f: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(self.title.clone())
            .borders(Borders::ALL);

        if self.series.is_empty() {
            let p = Paragraph::new(NO_DATA)
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(p, area);
            return;
        }

        let (ymin, ymax) = ChartPanel::y_bounds(&self.series, self.y_range);
        let (xmin, xmax) = ChartPanel::x_bounds(&self.series);

        let dataset = Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(self.color))
            .data(self.series.as_slice());

        let chart = Chart::new(vec![dataset])
            .block(block)
            .x_axis(
                Axis::default()
                    .title("s")
                    .bounds([xmin, xmax])
                    .labels(ChartPanel::labels(xmin, xmax, 3, 1)),
            )
            .y_axis(
                Axis::default()
                    .bounds([ymin, ymax])
                    .labels(ChartPanel::labels(ymin, ymax, 5, 2)),
            );

        f.render_widget(chart, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn y_bounds_pad_the_range() {
        let (lo, hi) = ChartPanel::y_bounds(&[(0.0, 0.0), (1.0, 10.0)], (-1.0, 1.0));
        assert!((lo + 1.0).abs() < 1e-9);
        assert!((hi - 11.0).abs() < 1e-9);
    }

    #[test]
    fn flat_series_still_has_height() {
        let (lo, hi) = ChartPanel::y_bounds(&[(0.0, 20.0), (1.0, 20.0)], (-1.0, 1.0));
        assert!(lo < 20.0 && hi > 20.0);
    }

    #[test]
    fn empty_series_uses_fallback() {
        assert_eq!(ChartPanel::y_bounds(&[], (-3.0, 3.0)), (-3.0, 3.0));
        assert_eq!(ChartPanel::x_bounds(&[]), (0.0, 1.0));
        assert_eq!(ChartPanel::x_bounds(&[(2.0, 0.0)]), (1.5, 2.5));
    }
}
