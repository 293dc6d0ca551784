//! src/ui.rs
//!
//! Top-level UI module re-exporting the layout helpers.

pub mod node;

pub use node::{Node, Panel, column, leaf, row};
