//! Render object tree: shapes, positions, drawing, and hit-testing.

pub mod node;
pub mod tree;
