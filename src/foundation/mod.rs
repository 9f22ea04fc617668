//! Shared clock, coordinate, and error types.

pub mod core;
pub mod error;
