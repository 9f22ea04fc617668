//! Fetch scheduling, view merging, and renderer dispatch.

/// Registry and cooldown scheduler.
pub mod controller;
/// Off-loop fetch execution.
pub mod executor;
