//! Flight plans: time-parameterized trajectories with pause, reverse, and bounce control.

/// Placement context and decision handlers consulted before each placement.
pub mod bounce;
/// Flight plan state machine over a working trajectory.
pub mod flight;
/// Static, orbit, and linear trajectories.
pub mod trajectory;
