//! Drawing command batches and the surfaces they are sent to.

/// Ordered drawing commands encoded into one payload.
pub mod batch;
/// Style keys, values, and colors.
pub mod style;
/// Remote surface boundary plus an in-memory recording surface.
pub mod transport;
