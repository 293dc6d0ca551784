//! src/panels/paragraph.rs
//!
//! Simple paragraph panel for help text, prompts and messages.

use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Paragraph, Wrap},
};

pub struct ParagraphPanel {
    pub text: String,
    pub title: String,
    pub style: Style,
}

impl ParagraphPanel {
    pub fn new(text: &str, title: &str) -> Self {
        Self {
            text: text.to_string(),
            title: title.to_string(),
            style: Style::default(),
        }
    }

    pub fn styled(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

impl crate::ui::Panel for ParagraphPanel {
    fn draw(&self, f: &mut Frame<'_>, area: Rect) {
        let p = Paragraph::new(self.text.as_str())
            .style(self.style)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(self.title.as_str())
                    .borders(Borders::ALL),
            );
        f.render_widget(p, area);
    }
}
