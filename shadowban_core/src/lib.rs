//! Shadow-ban Core - Opinion Dynamics Under Edge Suppression
//!
//! This library models how suppressing individual follow edges shifts the
//! opinions of a social network:
//! 1. **Influence**: bounded-confidence kernel on opinion differences
//! 2. **Dynamics**: RK4 integration of edge-weighted influence, clamped to `[0, 1]`
//! 3. **Control**: per-interval LP choosing a suppression multiplier per edge
//! 4. **Scoring**: mean / variance / extremism objectives over a trajectory

pub mod control;
pub mod dynamics;
pub mod graph;
pub mod kernel;
pub mod metrics;
pub mod objective;
pub mod params;
pub mod perturbation;

// Re-export key types for convenience
pub use control::{ControlOptimizer, ControlSolution};
pub use dynamics::DynamicsState;
pub use graph::InfluenceGraph;
pub use kernel::KernelKind;
pub use metrics::TrajectorySummary;
pub use objective::evaluate;
pub use params::{NetworkParams, SimParams};
