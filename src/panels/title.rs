//! src/panels/title.rs
//!
//! Header panel: application name and which screen is showing.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

pub struct TitlePanel {
    pub title: String,
    pub screen: String,
}

impl TitlePanel {
    pub fn new(title: &str, screen: &str) -> Self {
        Self {
            title: title.to_string(),
            screen: screen.to_string(),
        }
    }
}

impl crate::ui::Panel for TitlePanel {
    fn draw(&self, f: &mut Frame<'_>, area: Rect) {
        let line = Line::from(vec![
            Span::styled(self.title.as_str(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("  /  {}", self.screen)),
        ]);
        f.render_widget(Paragraph::new(line).block(Block::default().borders(Borders::ALL)), area);
    }
}
