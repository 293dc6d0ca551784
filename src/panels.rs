//! src/panels.rs
//!
//! Top-level panels module and re-exports.

pub mod chart;
pub mod history;
pub mod paragraph;
pub mod saved;
pub mod status;
pub mod title;

pub use chart::ChartPanel;
pub use history::HistoryPanel;
pub use paragraph::ParagraphPanel;
pub use saved::SavedListPanel;
pub use status::{LinkView, StatusPanel};
pub use title::TitlePanel;
