//! The suppression controller - linearized objective plus a budgeted LP.
//!
//! Each control interval solves
//!
//! ```text
//! minimize    c · u
//! subject to  Σ u_e <= ne · (1 - smax)
//!             1 - sedge <= u_e <= 1
//! ```
//!
//! where `c_e` is the sensitivity of the objective to edge `e`'s influence at
//! the current opinions. One sum constraint over box bounds is a fractional
//! knapsack, so the optimum is found exactly by greedy bound assignment
//! instead of a general simplex solver.

use nalgebra::DVector;
use shadowban_env::{ObjectiveMode, SimError, SimResult};

use crate::graph::InfluenceGraph;
use crate::kernel::KernelKind;
use crate::params::SimParams;

/// Decimal places kept in the LP cost vector.
pub const COEFFICIENT_DECIMALS: i32 = 5;

/// Relative slack allowed on the budget constraint.
const BUDGET_TOLERANCE: f64 = 1e-9;

/// Result of one control solve.
#[derive(Debug, Clone)]
pub struct ControlSolution {
    /// Suppression multiplier per edge
    pub control: DVector<f64>,

    /// Rounded LP cost vector the control was optimized against
    pub coefficients: DVector<f64>,
}

/// Per-interval LP controller.
#[derive(Debug, Clone)]
pub struct ControlOptimizer {
    kernel: KernelKind,
    tau: f64,
    omega: f64,
    smax: f64,
    sedge: f64,
}

impl ControlOptimizer {
    /// Creates an optimizer from the run parameters.
    pub fn new(params: &SimParams) -> Self {
        Self {
            kernel: params.kernel,
            tau: params.tau,
            omega: params.omega,
            smax: params.smax,
            sedge: params.sedge,
        }
    }

    /// Linearized sensitivity of `objective` to each edge.
    ///
    /// `c_e = C[target] * rate[source] * shift(x[source] - x[target])` with
    /// `C` the objective's derivative per target opinion (up to a positive
    /// factor): `-1` for MEAN, `x - mean` for VARMIN, `mean - x` for VARMAX.
    pub fn objective_gradient(
        &self,
        graph: &InfluenceGraph,
        state: &DVector<f64>,
        objective: ObjectiveMode,
    ) -> SimResult<DVector<f64>> {
        if state.len() != graph.num_vertices() {
            return Err(SimError::dimension("opinions", graph.num_vertices(), state.len()));
        }

        let per_vertex: DVector<f64> = match objective {
            ObjectiveMode::Mean => DVector::from_element(state.len(), -1.0),
            ObjectiveMode::VarMin => state.add_scalar(-state.mean()),
            ObjectiveMode::VarMax => -state.add_scalar(-state.mean()),
            ObjectiveMode::ExtMax | ObjectiveMode::ExtMin => {
                return Err(SimError::UnknownObjective(format!(
                    "{} has no control sensitivity",
                    objective
                )));
            }
        };

        let rates = graph.rates();
        Ok(DVector::from_iterator(
            graph.num_edges(),
            graph.edges().iter().map(|edge| {
                let influence = self.kernel.shift(
                    state[edge.source] - state[edge.target],
                    self.tau,
                    self.omega,
                );
                per_vertex[edge.target] * rates[edge.source] * influence
            }),
        ))
    }

    /// Computes the suppression vector for the current opinions.
    pub fn solve(
        &self,
        graph: &InfluenceGraph,
        state: &DVector<f64>,
        objective: ObjectiveMode,
    ) -> SimResult<ControlSolution> {
        let mut coefficients = self.objective_gradient(graph, state, objective)?;
        round_coefficients(&mut coefficients, COEFFICIENT_DECIMALS);
        let control = solve_budget_lp(&coefficients, self.smax, self.sedge)?;

        Ok(ControlSolution {
            control,
            coefficients,
        })
    }
}

/// Rounds every coefficient to `decimals` places, so near-identical costs
/// compare equal.
pub fn round_coefficients(coefficients: &mut DVector<f64>, decimals: i32) {
    let scale = 10f64.powi(decimals);
    coefficients.apply(|c| *c = (*c * scale).round() / scale);
}

/// Solves `min c·u` s.t. `Σu <= n(1 - smax)`, `u ∈ [1 - sedge, 1]^n`.
///
/// Every edge starts at the bound that minimizes its own cost (`1` for
/// `c_e <= 0`, `1 - sedge` for `c_e > 0`). While the sum exceeds the budget,
/// edges still at `1` are lowered in order of descending `c_e`, so the
/// cheapest cost increase is paid first; ties go to the lower edge index.
pub fn solve_budget_lp(costs: &DVector<f64>, smax: f64, sedge: f64) -> SimResult<DVector<f64>> {
    let n = costs.len();
    let lower = 1.0 - sedge;
    let upper = 1.0;
    let budget = n as f64 * (1.0 - smax);
    let slack = BUDGET_TOLERANCE * (n.max(1) as f64);

    if n as f64 * lower > budget + slack {
        return Err(SimError::InfeasibleControl {
            smax,
            sedge,
            num_edges: n,
        });
    }

    let mut control = DVector::from_iterator(
        n,
        costs.iter().map(|&c| if c > 0.0 { lower } else { upper }),
    );

    let mut excess = control.sum() - budget;
    if excess > slack {
        let mut order: Vec<usize> = (0..n).filter(|&e| costs[e] <= 0.0).collect();
        order.sort_by(|&a, &b| costs[b].total_cmp(&costs[a]).then(a.cmp(&b)));

        for e in order {
            if excess <= 0.0 {
                break;
            }
            let cut = (upper - lower).min(excess);
            control[e] = (control[e] - cut).clamp(lower, upper);
            excess -= cut;
        }
    }

    Ok(control)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use shadowban_env::Edge;

    fn triangle() -> InfluenceGraph {
        let edges = vec![Edge::new(0, 1), Edge::new(1, 0), Edge::new(1, 2)];
        InfluenceGraph::with_uniform_rate(3, edges, 1.0).unwrap()
    }

    fn opinions() -> DVector<f64> {
        DVector::from_vec(vec![0.2, 0.5, 0.8])
    }

    #[test]
    fn test_mean_gradient() {
        let optimizer = ControlOptimizer::new(&SimParams::default());
        let grad = optimizer
            .objective_gradient(&triangle(), &opinions(), ObjectiveMode::Mean)
            .unwrap();

        // c_e = -shift(x_src - x_tgt)
        assert_abs_diff_eq!(grad[0], 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(grad[1], -0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(grad[2], 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_variance_gradients_are_opposite() {
        let optimizer = ControlOptimizer::new(&SimParams::default());
        let graph = triangle();
        let min = optimizer
            .objective_gradient(&graph, &opinions(), ObjectiveMode::VarMin)
            .unwrap();
        let max = optimizer
            .objective_gradient(&graph, &opinions(), ObjectiveMode::VarMax)
            .unwrap();

        // edge 1 -> 2: (0.8 - 0.5) * (0.5 - 0.8)
        assert_abs_diff_eq!(min[2], -0.09, epsilon = 1e-12);
        assert_abs_diff_eq!(min + max, DVector::zeros(3), epsilon = 1e-12);
    }

    #[test]
    fn test_extremism_gradient_rejected() {
        let optimizer = ControlOptimizer::new(&SimParams::default());
        let err = optimizer
            .objective_gradient(&triangle(), &opinions(), ObjectiveMode::ExtMin)
            .unwrap_err();
        assert!(matches!(err, SimError::UnknownObjective(_)));
    }

    #[test]
    fn test_gradient_dimension_checked() {
        let optimizer = ControlOptimizer::new(&SimParams::default());
        let err = optimizer
            .objective_gradient(&triangle(), &DVector::zeros(2), ObjectiveMode::Mean)
            .unwrap_err();
        assert!(matches!(err, SimError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_rounding() {
        let mut c = DVector::from_vec(vec![0.123456789, -0.000004, 1.0]);
        round_coefficients(&mut c, 5);
        assert_abs_diff_eq!(c[0], 0.12346, epsilon = 1e-15);
        assert_eq!(c[1].abs(), 0.0);
        assert_eq!(c[2], 1.0);
    }

    #[test]
    fn test_lp_no_budget_is_all_ones() {
        let costs = DVector::from_vec(vec![0.5, -0.2, 0.0]);
        let u = solve_budget_lp(&costs, 0.0, 0.0).unwrap();
        assert_eq!(u, DVector::from_element(3, 1.0));
    }

    #[test]
    fn test_lp_positive_costs_go_to_lower_bound() {
        let costs = DVector::from_vec(vec![0.5, -0.2, 0.1]);
        let u = solve_budget_lp(&costs, 0.0, 0.4).unwrap();
        assert_abs_diff_eq!(u, DVector::from_vec(vec![0.6, 1.0, 0.6]), epsilon = 1e-12);
    }

    #[test]
    fn test_lp_budget_cuts_cheapest_first() {
        // budget 4 * 0.75 = 3, bounds [0.5, 1]
        let costs = DVector::from_vec(vec![-1.0, -0.1, -0.5, -0.3]);
        let u = solve_budget_lp(&costs, 0.25, 0.5).unwrap();

        assert_abs_diff_eq!(u[1], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(u[3], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(u[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(u[2], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(u.sum(), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_lp_fractional_edge() {
        // budget 3 * 0.9 = 2.7, bounds [0, 1]: only edge 1 is cut, by 0.3
        let costs = DVector::from_vec(vec![-0.5, -0.1, -0.9]);
        let u = solve_budget_lp(&costs, 0.1, 1.0).unwrap();
        assert_abs_diff_eq!(u[1], 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(u[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(u[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_lp_infeasible() {
        let costs = DVector::from_vec(vec![-1.0, -1.0]);
        let err = solve_budget_lp(&costs, 0.5, 0.2).unwrap_err();
        assert!(matches!(err, SimError::InfeasibleControl { num_edges: 2, .. }));
    }

    #[test]
    fn test_lp_full_budget_needs_full_depth() {
        // smax = 1 leaves a zero budget, unreachable while sedge < 1
        let costs = DVector::from_vec(vec![-1.0, 0.0, 2.0]);
        let err = solve_budget_lp(&costs, 1.0, 0.5).unwrap_err();
        assert!(matches!(
            err,
            SimError::InfeasibleControl { smax, sedge, num_edges: 3 } if smax == 1.0 && sedge == 0.5
        ));
    }

    #[test]
    fn test_lp_ban_everything() {
        let costs = DVector::from_vec(vec![-1.0, 0.0, 2.0]);
        let u = solve_budget_lp(&costs, 1.0, 1.0).unwrap();
        assert_eq!(u, DVector::zeros(3));
    }

    #[test]
    fn test_lp_tight_budget_at_equal_bounds() {
        let costs = DVector::from_vec(vec![-1.0, -2.0, -3.0]);
        let u = solve_budget_lp(&costs, 0.3, 0.3).unwrap();
        for x in u.iter() {
            assert_abs_diff_eq!(*x, 0.7, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_lp_empty_graph() {
        let u = solve_budget_lp(&DVector::zeros(0), 0.5, 0.1).unwrap();
        assert_eq!(u.len(), 0);
    }
}
