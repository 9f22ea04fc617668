//! Keyed datasets, the sources that fetch them, and the renderers that consume them.

pub mod dataset;
pub mod renderer;
pub mod source;
