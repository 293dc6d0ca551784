//! src/panels/status.rs
//!
//! Status panel: chart state, corrections in effect and link health.

use std::time::Instant;

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::chart::ChartState;
use crate::chart::shared::ChartStatus;
use crate::feed::Subscription;

/// Link figures copied out of the subscription for one frame.
pub struct LinkView {
    pub name: String,
    pub connected: bool,
    pub running: bool,
    pub bitrate: u64,
    pub bytes: u64,
}

impl LinkView {
    pub fn of(sub: &Subscription) -> Self {
        Self {
            name: sub.name().to_string(),
            connected: sub.link().is_connected(),
            running: sub.is_running(),
            bitrate: sub.link().bitrate(),
            bytes: sub.link().bytes(),
        }
    }

    /// No feed attached.
    pub fn detached() -> Self {
        Self {
            name: "no feed".into(),
            connected: false,
            running: false,
            bitrate: 0,
            bytes: 0,
        }
    }
}

pub struct StatusPanel {
    pub status: ChartStatus,
    pub link: LinkView,
}

impl StatusPanel {
    pub fn new(status: ChartStatus, link: LinkView) -> Self {
        Self { status, link }
    }
}

impl crate::ui::Panel for StatusPanel {
    fn draw(&self, f: &mut Frame<'_>, area: Rect) {
        let s = &self.status;
        let state_style = match s.state {
            ChartState::Active => Style::default().fg(Color::Green),
            ChartState::Inactive => Style::default().fg(Color::Yellow),
            ChartState::Cleared => Style::default().fg(Color::Gray),
        };
        let updated = s
            .last_update
            .map(|t| format!("{:.1}s ago", Instant::now().duration_since(t).as_secs_f64()))
            .unwrap_or_else(|| "never".into());

        let (link_text, link_style) = if self.link.connected {
            ("up", Style::default().fg(Color::Green))
        } else if self.link.running {
            ("connecting", Style::default().fg(Color::Yellow))
        } else {
            ("down", Style::default().fg(Color::Red))
        };

        let lines = vec![
            Line::from(vec![
                Span::raw("state "),
                Span::styled(s.state.as_str(), state_style.add_modifier(Modifier::BOLD)),
                Span::raw(format!("  samples={}  updated {}", s.len, updated)),
            ]),
            Line::from(vec![Span::raw(format!(
                "scale={}  clock={} us",
                s.pressure_scale, s.clock_offset
            ))]),
            Line::from(vec![
                Span::raw(format!("{} ", self.link.name)),
                Span::styled(link_text, link_style),
                Span::raw(format!("  {} B/s  {} B", self.link.bitrate, self.link.bytes)),
            ]),
        ];

        let block = Block::default().title("Status").borders(Borders::ALL);
        f.render_widget(Paragraph::new(lines).block(block), area);
    }
}
