use std::fmt;

use crate::foundation::core::{Coords, Seconds};
use crate::motion::flight::FlightPlan;

/// Where a flight plan's local output lands in surface space.
///
/// Root nodes place their local position as-is; children are scaled by their own scale and
/// offset by the parent's position at the same instant.
#[derive(Clone, Debug)]
pub struct PlacementFrame<'a> {
    /// Name of the node owning the plan.
    pub node: &'a str,
    /// The node's scale factor.
    pub scale: f64,
    /// Parent position at the evaluation instant, `None` for a root.
    pub parent_offset: Option<Coords>,
}

impl<'a> PlacementFrame<'a> {
    /// Frame for a parentless node.
    pub fn root(node: &'a str) -> Self {
        Self {
            node,
            scale: 1.0,
            parent_offset: None,
        }
    }

    /// Map a local position into surface space.
    pub fn place(&self, local: Coords) -> Coords {
        match &self.parent_offset {
            Some(parent) => local.scaled(self.scale).offset_by(parent),
            None => local,
        }
    }
}

/// Hook that may adjust a trajectory in flight, invoked before every position evaluation.
pub trait TrajectoryDecisionHandler: Send + Sync + fmt::Debug {
    /// Inspect the plan at `t` and mutate its working trajectory if needed.
    fn decide(&self, frame: &PlacementFrame<'_>, plan: &mut FlightPlan, t: Seconds);
}

impl<F> TrajectoryDecisionHandler for FnHandler<F>
where
    F: Fn(&PlacementFrame<'_>, &mut FlightPlan, Seconds) + Send + Sync,
{
    fn decide(&self, frame: &PlacementFrame<'_>, plan: &mut FlightPlan, t: Seconds) {
        (self.0)(frame, plan, t)
    }
}

/// Adapter turning a closure into a [`TrajectoryDecisionHandler`].
pub struct FnHandler<F>(pub F);

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHandler")
    }
}

/// Reflects a moving node off the edges of a bounding box.
///
/// The box is `[x1, x2] × [y1, y2]` shrunk by the node's size component; `[r1, r2]` bounds the
/// size component itself.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BounceHandler {
    pub x1: f64,
    pub y1: f64,
    pub r1: f64,
    pub x2: f64,
    pub y2: f64,
    pub r2: f64,
}

impl BounceHandler {
    pub fn new(x1: f64, y1: f64, r1: f64, x2: f64, y2: f64, r2: f64) -> Self {
        Self {
            x1,
            y1,
            r1,
            x2,
            y2,
            r2,
        }
    }

    /// Indices of rate components that must flip for `pos` moving at `rate`.
    fn crossings(&self, pos: &Coords, rate: &Coords) -> Vec<usize> {
        let size = pos.extent();
        let mut flips = Vec::new();
        if (pos.x() < self.x1 + size && rate.get(0) < 0.0)
            || (pos.x() > self.x2 - size && rate.get(0) > 0.0)
        {
            flips.push(0);
        }
        if (pos.y() < self.y1 + size && rate.get(1) < 0.0)
            || (pos.y() > self.y2 - size && rate.get(1) > 0.0)
        {
            flips.push(1);
        }
        if (size < self.r1 && rate.get(2) < 0.0) || (size > self.r2 && rate.get(2) > 0.0) {
            flips.push(2);
        }
        flips
    }
}

impl TrajectoryDecisionHandler for BounceHandler {
    fn decide(&self, frame: &PlacementFrame<'_>, plan: &mut FlightPlan, t: Seconds) {
        if !plan.is_active(t) {
            return;
        }
        let Some(rate) = plan.trajectory().rate() else {
            return;
        };
        let pos = frame.place(plan.local_position(t));
        let flips = self.crossings(&pos, rate);
        if flips.is_empty() {
            return;
        }

        tracing::debug!(node = frame.node, ?flips, "bounce");
        plan.rebase(t);
        if let Some(rate) = plan.trajectory_mut().rate_mut() {
            for i in flips {
                if let Some(c) = rate.0.get_mut(i) {
                    *c = -*c;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/motion/bounce.rs"]
mod tests;
