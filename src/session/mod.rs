//! Connected surfaces and the loops that keep them current.

pub mod engine;
pub mod viewer;
