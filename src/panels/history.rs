//! src/panels/history.rs
//!
//! History panel: the most recent samples of the live chart, newest last.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::chart::Sample;

pub struct HistoryPanel {
    pub samples: Vec<Sample>,
}

impl HistoryPanel {
    /// Keep only the last `max` samples.
    pub fn tail(samples: &[Sample], max: usize) -> Self {
        let start = samples.len().saturating_sub(max);
        Self {
            samples: samples[start..].to_vec(),
        }
    }
}

impl crate::ui::Panel for HistoryPanel {
    fn draw(&self, f: &mut Frame<'_>, area: Rect) {
        // borders take two rows
        let rows = area.height.saturating_sub(2) as usize;
        let start = self.samples.len().saturating_sub(rows);
        let last_index = self.samples.len().saturating_sub(1);

        let lines: Vec<Line> = self
            .samples
            .iter()
            .enumerate()
            .skip(start)
            .map(|(i, s)| {
                let style = if i == last_index {
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Cyan)
                };
                Line::from(vec![
                    Span::styled(format!("{:>12.6}", s.x), Style::default().fg(Color::Green)),
                    Span::raw("  "),
                    Span::styled(format!("{:>10.4}", s.y), style),
                ])
            })
            .collect();

        let block = Block::default().title("Samples").borders(Borders::ALL);
        f.render_widget(Paragraph::new(lines).block(block), area);
    }
}
