//! Simulation and network parameters.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use shadowban_env::{Edge, ObjectiveMode, SimError, SimResult};

use crate::graph::InfluenceGraph;
use crate::kernel::KernelKind;

/// Configuration for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    /// Influence kernel
    pub kernel: KernelKind,

    /// Confidence threshold of the kernel
    pub tau: f64,

    /// Influence scale of the kernel
    pub omega: f64,

    /// Average suppression budget (fraction of edge influence removed)
    pub smax: f64,

    /// Per-edge suppression depth; controls live in `[1 - sedge, 1]`
    pub sedge: f64,

    /// Number of control intervals (also the horizon `Tf`)
    pub control_steps: usize,

    /// Integration steps per control interval
    pub sim_steps: usize,

    /// Objective scored and, with shadow-banning on, optimized
    pub objective: ObjectiveMode,

    /// Extremism threshold for EXTMAX / EXTMIN
    pub thres: f64,

    /// Enables the LP suppression controller
    pub shadowban: bool,

    /// Emulates the field-experiment edge damping at reset
    pub experiment: bool,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            kernel: KernelKind::HegselmannKrause,
            tau: 0.5,
            omega: 1.0,
            smax: 0.0,
            sedge: 0.0,
            control_steps: 10,
            sim_steps: 24,
            objective: ObjectiveMode::Mean,
            thres: 0.7,
            shadowban: true,
            experiment: false,
        }
    }
}

impl SimParams {
    /// Integration time step (one control interval has unit length).
    pub fn dt(&self) -> f64 {
        1.0 / self.sim_steps as f64
    }

    /// Total number of recorded opinion samples in a run.
    pub fn num_samples(&self) -> usize {
        self.sim_steps * self.control_steps + 1
    }

    /// Sets the kernel parameters.
    pub fn with_kernel(mut self, tau: f64, omega: f64) -> Self {
        self.tau = tau;
        self.omega = omega;
        self
    }

    /// Sets the suppression budget and depth.
    pub fn with_suppression(mut self, smax: f64, sedge: f64) -> Self {
        self.smax = smax;
        self.sedge = sedge;
        self
    }

    /// Sets the step counts.
    pub fn with_steps(mut self, control_steps: usize, sim_steps: usize) -> Self {
        self.control_steps = control_steps;
        self.sim_steps = sim_steps;
        self
    }

    /// Sets the objective mode.
    pub fn with_objective(mut self, objective: ObjectiveMode) -> Self {
        self.objective = objective;
        self
    }

    /// Enables or disables the suppression controller.
    pub fn with_shadowban(mut self, enabled: bool) -> Self {
        self.shadowban = enabled;
        self
    }

    /// Enables or disables the experiment perturbation.
    pub fn with_experiment(mut self, enabled: bool) -> Self {
        self.experiment = enabled;
        self
    }

    /// Checks every parameter range. No value is ever replaced by a default.
    pub fn validate(&self) -> SimResult<()> {
        if self.control_steps == 0 {
            return Err(SimError::invalid("control_steps must be at least 1"));
        }
        if self.sim_steps == 0 {
            return Err(SimError::invalid("sim_steps must be at least 1"));
        }
        if !(self.tau >= 0.0 && self.tau.is_finite()) {
            return Err(SimError::invalid(format!("tau must be finite and >= 0, got {}", self.tau)));
        }
        if !self.omega.is_finite() {
            return Err(SimError::invalid(format!("omega must be finite, got {}", self.omega)));
        }
        if !(0.0..=1.0).contains(&self.smax) {
            return Err(SimError::invalid(format!("smax must lie in [0, 1], got {}", self.smax)));
        }
        if !(0.0..=1.0).contains(&self.sedge) {
            return Err(SimError::invalid(format!("sedge must lie in [0, 1], got {}", self.sedge)));
        }
        if !self.thres.is_finite() {
            return Err(SimError::invalid("thres must be finite"));
        }
        if self.shadowban && !self.objective.is_differentiable() {
            return Err(SimError::UnknownObjective(format!(
                "{} has no control sensitivity; use it for scoring only",
                self.objective
            )));
        }
        Ok(())
    }
}

/// Network topology, rates and initial opinions, as loaded from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub num_vertices: usize,

    /// `(following, follower)` pairs
    pub edges: Vec<(usize, usize)>,

    pub rates: Vec<f64>,

    pub opinions0: Vec<f64>,
}

impl NetworkParams {
    /// Builds the immutable influence graph.
    pub fn graph(&self) -> SimResult<InfluenceGraph> {
        let edges = self.edges.iter().copied().map(Edge::from).collect();
        InfluenceGraph::new(
            self.num_vertices,
            edges,
            DVector::from_column_slice(&self.rates),
        )
    }

    /// Returns the initial opinions after checking length and range.
    pub fn initial_opinions(&self) -> SimResult<DVector<f64>> {
        if self.opinions0.len() != self.num_vertices {
            return Err(SimError::dimension("opinions0", self.num_vertices, self.opinions0.len()));
        }
        if let Some(x) = self.opinions0.iter().find(|x| !(0.0..=1.0).contains(*x)) {
            return Err(SimError::invalid(format!("initial opinion {} outside [0, 1]", x)));
        }
        Ok(DVector::from_column_slice(&self.opinions0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        let params = SimParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.num_samples(), 241);
        assert!((params.dt() - 1.0 / 24.0).abs() < 1e-15);
    }

    #[test]
    fn test_ranges_rejected() {
        assert!(SimParams::default().with_suppression(1.5, 0.0).validate().is_err());
        assert!(SimParams::default().with_suppression(0.1, -0.1).validate().is_err());
        assert!(SimParams::default().with_steps(0, 24).validate().is_err());
        assert!(SimParams::default().with_kernel(-0.1, 1.0).validate().is_err());
    }

    #[test]
    fn test_extremism_objective_needs_scoring_only() {
        let params = SimParams::default().with_objective(ObjectiveMode::ExtMax);
        assert!(matches!(params.validate(), Err(SimError::UnknownObjective(_))));

        let params = params.with_shadowban(false);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_network_params_checks_opinions() {
        let net = NetworkParams {
            num_vertices: 2,
            edges: vec![(0, 1)],
            rates: vec![1.0, 1.0],
            opinions0: vec![0.2, 1.2],
        };
        assert!(net.graph().is_ok());
        assert!(matches!(net.initial_opinions(), Err(SimError::InvalidParameter(_))));
    }
}
