//! src/panels/saved.rs
//!
//! Saved-charts list with the current selection and any files that failed
//! to load.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::record::SavedCharts;

pub struct SavedListPanel {
    pub names: Vec<String>,
    pub selected: Option<usize>,
    pub failures: Vec<String>,
}

impl SavedListPanel {
    pub fn new(saved: &SavedCharts, selected: usize) -> Self {
        Self {
            names: saved
                .charts
                .iter()
                .map(|c| format!("{} ({} pts)", c.name, c.samples.len()))
                .collect(),
            selected: (!saved.charts.is_empty()).then_some(selected),
            failures: saved.failures.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl crate::ui::Panel for SavedListPanel {
    fn draw(&self, f: &mut Frame<'_>, area: Rect) {
        let fail_rows = if self.failures.is_empty() {
            0
        } else {
            (self.failures.len() as u16 + 2).min(area.height / 2)
        };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(fail_rows)])
            .split(area);

        let title = format!("Saved charts ({})", self.names.len());
        let block = Block::default().title(title).borders(Borders::ALL);
        if self.names.is_empty() {
            f.render_widget(Paragraph::new("No saved charts").block(block), chunks[0]);
        } else {
            let items: Vec<ListItem> = self.names.iter().map(|n| ListItem::new(n.as_str())).collect();
            let list = List::new(items)
                .block(block)
                .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
                .highlight_symbol("> ");
            let mut state = ListState::default().with_selected(self.selected);
            f.render_stateful_widget(list, chunks[0], &mut state);
        }

        if fail_rows > 0 {
            let lines: Vec<Line> = self.failures.iter().map(|e| Line::from(e.as_str())).collect();
            let p = Paragraph::new(lines)
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true })
                .block(Block::default().title("Unreadable").borders(Borders::ALL));
            f.render_widget(p, chunks[1]);
        }
    }
}
