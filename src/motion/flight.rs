use std::sync::Arc;

use crate::foundation::core::{Coords, Seconds, now_secs};
use crate::foundation::error::LiveCanvasResult;
use crate::motion::bounce::{PlacementFrame, TrajectoryDecisionHandler};
use crate::motion::trajectory::Trajectory;

/// Lifecycle phase of a [`FlightPlan`] at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlightState {
    /// No start time, or the start time is still ahead.
    NotStarted,
    /// Elapsed time is advancing.
    Running,
    /// Frozen at the pause mark.
    Paused,
    /// Elapsed time reached the maximum duration.
    Completed,
}

/// Time-parameterized position source ("flight plan") owned by one render object.
///
/// The declared trajectory is kept untouched; every start snapshots it into a working copy
/// that reversal, rebasing and decision handlers are free to mutate.
///
/// Working time is wall time since start, clamped to `[0, duration]` and frozen at the pause
/// mark while paused.
#[derive(Clone, Debug, Default)]
pub struct FlightPlan {
    name: Option<String>,
    declared: Trajectory,
    working: Trajectory,
    start: Option<Seconds>,
    pause: Option<Seconds>,
    duration: Option<Seconds>,
    handlers: Vec<Arc<dyn TrajectoryDecisionHandler>>,
}

impl FlightPlan {
    /// Create an unstarted plan for `trajectory`.
    pub fn new(trajectory: Trajectory) -> Self {
        Self {
            name: None,
            working: trajectory.clone(),
            declared: trajectory,
            start: None,
            pause: None,
            duration: None,
            handlers: Vec::new(),
        }
    }

    /// Static placement at `(x, y)`.
    pub fn fixed(x: f64, y: f64) -> Self {
        Self::new(Trajectory::fixed(x, y))
    }

    /// Cap working time at `secs`.
    pub fn with_duration(mut self, secs: Seconds) -> Self {
        self.duration = Some(secs);
        self
    }

    /// Attach a name for diagnostics.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append a decision handler; handlers run in attachment order.
    pub fn with_handler(mut self, handler: Arc<dyn TrajectoryDecisionHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn start_time(&self) -> Option<Seconds> {
        self.start
    }

    pub fn pause_time(&self) -> Option<Seconds> {
        self.pause
    }

    pub fn duration(&self) -> Option<Seconds> {
        self.duration
    }

    /// Trajectory as declared at construction.
    pub fn declared(&self) -> &Trajectory {
        &self.declared
    }

    /// Trajectory currently being flown.
    pub fn trajectory(&self) -> &Trajectory {
        &self.working
    }

    /// Mutable access to the working trajectory, for decision handlers.
    pub fn trajectory_mut(&mut self) -> &mut Trajectory {
        &mut self.working
    }

    pub fn handlers(&self) -> &[Arc<dyn TrajectoryDecisionHandler>] {
        &self.handlers
    }

    /// Snapshot the declared trajectory and start flying it at `start` (default: now).
    pub fn start_forward(&mut self, start: Option<Seconds>) {
        self.working = self.declared.clone();
        self.start = Some(start.unwrap_or_else(now_secs));
        self.pause = None;
    }

    /// Reverse direction in place, measuring the current position now.
    ///
    /// The new flight begins at `start` (default: now).
    pub fn start_reverse(&mut self, start: Option<Seconds>) -> LiveCanvasResult<()> {
        let moment = now_secs();
        self.reverse_at(moment, start.unwrap_or(moment))
    }

    /// Reverse direction in place.
    ///
    /// Working time elapsed at `moment` is folded into the trajectory baseline and the rates
    /// are negated, so the position at `start` equals the position the forward flight had at
    /// `moment`. Trajectories without rates fail with
    /// [`LiveCanvasError::UnsupportedTrajectoryOperation`](crate::LiveCanvasError::UnsupportedTrajectoryOperation)
    /// and are left unchanged.
    pub fn reverse_at(&mut self, moment: Seconds, start: Seconds) -> LiveCanvasResult<()> {
        let tz = self.working_time(moment);
        let mut next = self.working.clone();
        next.negate_rates()?;
        // (-rate) * (-tz) advances the baseline by the forward motion so far
        next.fold(-tz);
        self.working = next;
        self.start = Some(start);
        self.pause = None;
        Ok(())
    }

    /// Restart the working trajectory from its position at `t`.
    pub fn rebase(&mut self, t: Seconds) {
        let tz = self.working_time(t);
        self.working.fold(tz);
        self.start = Some(t);
        self.pause = None;
    }

    /// Freeze working time now.
    pub fn pause(&mut self) {
        self.pause_at(now_secs());
    }

    /// Freeze working time at `t`. Pausing an already paused plan keeps the first mark.
    pub fn pause_at(&mut self, t: Seconds) {
        if self.pause.is_none() {
            self.pause = Some(t);
        }
    }

    /// Resume a paused plan now.
    pub fn resume(&mut self) {
        self.resume_at(now_secs());
    }

    /// Resume a paused plan at `t`, shifting the timeline forward by the paused interval.
    pub fn resume_at(&mut self, t: Seconds) {
        let Some(paused) = self.pause.take() else {
            return;
        };
        if let Some(start) = self.start.as_mut() {
            *start += t - paused;
        }
    }

    /// Working time at wall time `t`.
    pub fn working_time(&self, t: Seconds) -> f64 {
        let Some(start) = self.start else {
            return 0.0;
        };
        let elapsed = match self.pause {
            Some(paused) => paused.min(t) - start,
            None => t - start,
        };
        if elapsed <= 0.0 {
            return 0.0;
        }
        match self.duration {
            Some(d) => elapsed.min(d.max(0.0)),
            None => elapsed,
        }
    }

    /// Lifecycle phase at `t`.
    pub fn state(&self, t: Seconds) -> FlightState {
        let Some(start) = self.start else {
            return FlightState::NotStarted;
        };
        if self.pause.is_some() {
            return FlightState::Paused;
        }
        if t <= start {
            return FlightState::NotStarted;
        }
        match self.duration {
            Some(d) if t - start >= d => FlightState::Completed,
            _ => FlightState::Running,
        }
    }

    /// Return `true` while the plan is running at `t`.
    pub fn is_active(&self, t: Seconds) -> bool {
        self.state(t) == FlightState::Running
    }

    /// Position relative to the owner's parent, before scaling.
    pub fn local_position(&self, t: Seconds) -> Coords {
        self.working.position(self.working_time(t))
    }

    /// Run every attached decision handler against this plan.
    pub fn decide(&mut self, frame: &PlacementFrame<'_>, t: Seconds) {
        if self.handlers.is_empty() {
            return;
        }
        let handlers = self.handlers.clone();
        for handler in &handlers {
            handler.decide(frame, self, t);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/motion/flight.rs"]
mod tests;
