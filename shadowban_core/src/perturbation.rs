//! Field-experiment emulation: one-shot damping of like-minded edges.

use nalgebra::DVector;

use crate::graph::InfluenceGraph;

/// Multiplier applied to a damped edge (30% reduction).
pub const EXPERIMENT_DAMPING: f64 = 1.0 - 0.3;

/// Per-edge multiplicative factors for the experiment perturbation.
///
/// An edge is damped when both endpoints start on the same side: the follower
/// at or below 0.5 with the followed account at or below 0.4, or the follower
/// above 0.5 with the followed account at or above 0.6. Every other edge
/// keeps factor 1. Depends only on the initial opinions.
pub fn experiment_factors(initial: &DVector<f64>, graph: &InfluenceGraph) -> DVector<f64> {
    DVector::from_iterator(
        graph.num_edges(),
        graph.edges().iter().map(|edge| {
            let follower = initial[edge.target];
            let following = initial[edge.source];
            let low = follower <= 0.5 && following <= 0.4;
            let high = follower > 0.5 && following >= 0.6;
            if low || high {
                EXPERIMENT_DAMPING
            } else {
                1.0
            }
        }),
    )
}
