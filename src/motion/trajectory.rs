use kurbo::Point;

use crate::foundation::core::Coords;
use crate::foundation::error::{LiveCanvasError, LiveCanvasResult};

/// Position as a pure function of working time.
///
/// Rates are expressed per second of working time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trajectory {
    /// Fixed placement. `position` is usually `[x, y]` or `[x, y, size]`.
    Static {
        /// Placement coordinates.
        position: Coords,
    },
    /// Circular motion around `center`.
    ///
    /// `baseline` and `rate` are `(angle in degrees, orbit radius, node size)`; the size
    /// component is optional.
    Orbit {
        /// Orbit center.
        center: Point,
        /// Components at working time zero.
        baseline: Coords,
        /// Change per second for each baseline component.
        rate: Coords,
    },
    /// Straight-line motion, one velocity per component.
    Linear {
        /// Components at working time zero.
        origin: Coords,
        /// Change per second for each component.
        velocity: Coords,
    },
}

impl Default for Trajectory {
    fn default() -> Self {
        Self::Static {
            position: Coords::xys(0.0, 0.0, 10.0),
        }
    }
}

impl Trajectory {
    /// Static placement at `(x, y)`.
    pub fn fixed(x: f64, y: f64) -> Self {
        Self::Static {
            position: Coords::xy(x, y),
        }
    }

    /// Orbit around `center` starting from `baseline`.
    pub fn orbit(center: Point, baseline: Coords, rate: Coords) -> Self {
        Self::Orbit {
            center,
            baseline,
            rate,
        }
    }

    /// Linear motion from `origin`.
    pub fn linear(origin: Coords, velocity: Coords) -> Self {
        Self::Linear { origin, velocity }
    }

    /// Short name used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Static { .. } => "static",
            Self::Orbit { .. } => "orbit",
            Self::Linear { .. } => "linear",
        }
    }

    /// Evaluate at working time `tz` (seconds since the flight started, already clamped).
    pub fn position(&self, tz: f64) -> Coords {
        match self {
            Self::Static { position } => position.clone(),
            Self::Orbit {
                center,
                baseline,
                rate,
            } => {
                let angle = (baseline.get(0) + rate.get(0) * tz).rem_euclid(360.0);
                let radius = baseline.get(1) + rate.get(1) * tz;
                let (sin, cos) = angle.to_radians().sin_cos();
                let mut out = Coords::xy(center.x + cos * radius, center.y + sin * radius);
                if baseline.len() > 2 || rate.len() > 2 {
                    out.0.push(baseline.get(2) + rate.get(2) * tz);
                }
                out
            }
            Self::Linear { origin, velocity } => {
                let n = origin.len().max(velocity.len());
                Coords(
                    (0..n)
                        .map(|i| origin.get(i) + velocity.get(i) * tz)
                        .collect(),
                )
            }
        }
    }

    /// Rate vector, when the trajectory has one.
    pub fn rate(&self) -> Option<&Coords> {
        match self {
            Self::Static { .. } => None,
            Self::Orbit { rate, .. } => Some(rate),
            Self::Linear { velocity, .. } => Some(velocity),
        }
    }

    /// Mutable rate vector, when the trajectory has one.
    pub fn rate_mut(&mut self) -> Option<&mut Coords> {
        match self {
            Self::Static { .. } => None,
            Self::Orbit { rate, .. } => Some(rate),
            Self::Linear { velocity, .. } => Some(velocity),
        }
    }

    /// Fold `tz` seconds of motion into the baseline, so that evaluating at zero afterwards
    /// yields what evaluating at `tz` yielded before.
    pub fn fold(&mut self, tz: f64) {
        let (base, rate) = match self {
            Self::Static { .. } => return,
            Self::Orbit { baseline, rate, .. } => (baseline, rate),
            Self::Linear { origin, velocity } => (origin, velocity),
        };
        let n = base.len().max(rate.len());
        *base = Coords((0..n).map(|i| base.get(i) + rate.get(i) * tz).collect());
    }

    /// Negate every rate component.
    pub fn negate_rates(&mut self) -> LiveCanvasResult<()> {
        let kind = self.kind();
        let rate = self.rate_mut().ok_or_else(|| {
            LiveCanvasError::unsupported(format!("{kind} trajectory does not define reverse flight"))
        })?;
        for c in rate.0.iter_mut() {
            *c = -*c;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/motion/trajectory.rs"]
mod tests;
