//! The `OpinionEnv` trait - the seam between the driver and the dynamics.

use nalgebra::DVector;

use crate::error::SimResult;
use crate::types::{ControlStep, SimStep};

/// An interval-controlled opinion environment.
///
/// The driver runs it as
/// `reset → (control_step → sim_step × sim_steps) × control_steps`.
/// Implementations own their opinion state; the driver only observes it.
pub trait OpinionEnv {
    /// Number of vertices (length of the opinion vector).
    fn num_vertices(&self) -> usize;

    /// Number of edges (length of the control vector).
    fn num_edges(&self) -> usize;

    /// Number of control intervals per run.
    fn control_steps(&self) -> usize;

    /// Number of integration steps per control interval.
    fn sim_steps(&self) -> usize;

    /// Restores the initial opinions and zeroes the step counters.
    ///
    /// Returns the initial opinion vector.
    fn reset(&mut self) -> DVector<f64>;

    /// Decides the suppression vector for the next interval from `state`.
    fn control_step(&mut self, state: &DVector<f64>) -> SimResult<ControlStep>;

    /// Advances the opinions by one integration step under `control`.
    fn sim_step(&mut self, control: &DVector<f64>) -> SimResult<SimStep>;
}
