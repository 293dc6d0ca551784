//! src/ui/node.rs
//!
//! Layout tree rebuilt every frame: groups split an area, leaves draw a panel.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Anything that can draw itself into an area.
pub trait Panel {
    fn draw(&self, f: &mut Frame<'_>, area: Rect);
}

pub enum Node {
    Group {
        direction: Direction,
        constraints: Vec<Constraint>,
        children: Vec<Node>,
    },
    Leaf(Box<dyn Panel>),
}

impl Node {
    /// Draw the node into the given area. Children beyond the constraint
    /// count are not drawn.
    pub fn draw(&self, f: &mut Frame<'_>, area: Rect) {
        match self {
            Node::Group {
                direction,
                constraints,
                children,
            } => {
                let chunks = Layout::default()
                    .direction(*direction)
                    .constraints(constraints.iter().copied())
                    .split(area);
                for (child, chunk) in children.iter().zip(chunks.iter()) {
                    child.draw(f, *chunk);
                }
            }
            Node::Leaf(panel) => panel.draw(f, area),
        }
    }
}

/// Stack children top to bottom.
pub fn column(constraints: Vec<Constraint>, children: Vec<Node>) -> Node {
    Node::Group {
        direction: Direction::Vertical,
        constraints,
        children,
    }
}

/// Place children left to right.
pub fn row(constraints: Vec<Constraint>, children: Vec<Node>) -> Node {
    Node::Group {
        direction: Direction::Horizontal,
        constraints,
        children,
    }
}

pub fn leaf(panel: impl Panel + 'static) -> Node {
    Node::Leaf(Box::new(panel))
}
