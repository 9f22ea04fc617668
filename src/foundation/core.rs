use std::time::{SystemTime, UNIX_EPOCH};

use smallvec::SmallVec;

pub use kurbo::{Point, Size, Vec2};

/// Wall-clock time in seconds since the Unix epoch.
///
/// Every timestamp the engine handles (flight-plan start and pause marks, fetch completion,
/// next-fire times) lives on this single axis, so values from different components can be
/// compared directly.
pub type Seconds = f64;

/// Current wall-clock time as [`Seconds`].
pub fn now_secs() -> Seconds {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Coordinate vector produced by a trajectory.
///
/// Components are positional: `[x, y]` for plain placement and `[x, y, size]` when the
/// trajectory also animates the node's extent (orbit node radius, bounce size).
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coords(pub SmallVec<[f64; 4]>);

impl Coords {
    /// Build from a slice of components.
    pub fn new(components: &[f64]) -> Self {
        Self(SmallVec::from_slice(components))
    }

    /// Two-component `[x, y]` coordinates.
    pub fn xy(x: f64, y: f64) -> Self {
        Self::new(&[x, y])
    }

    /// Three-component `[x, y, size]` coordinates.
    pub fn xys(x: f64, y: f64, size: f64) -> Self {
        Self::new(&[x, y, size])
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return `true` when there are no components.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Component `i`, or `0.0` when absent.
    pub fn get(&self, i: usize) -> f64 {
        self.0.get(i).copied().unwrap_or(0.0)
    }

    /// Horizontal component.
    pub fn x(&self) -> f64 {
        self.get(0)
    }

    /// Vertical component.
    pub fn y(&self) -> f64 {
        self.get(1)
    }

    /// Size component (index 2), `0.0` for plain placements.
    pub fn extent(&self) -> f64 {
        self.get(2)
    }

    /// The `(x, y)` part as a point.
    pub fn point(&self) -> Point {
        Point::new(self.x(), self.y())
    }

    /// Components as a slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Multiply every component by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self(self.0.iter().map(|c| c * factor).collect())
    }

    /// Add `parent` component-wise.
    ///
    /// The result keeps this vector's length; parent components beyond it are ignored and
    /// missing parent components count as zero.
    pub fn offset_by(&self, parent: &Coords) -> Self {
        Self(
            self.0
                .iter()
                .enumerate()
                .map(|(i, c)| c + parent.get(i))
                .collect(),
        )
    }
}

impl From<Point> for Coords {
    fn from(p: Point) -> Self {
        Self::xy(p.x, p.y)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
