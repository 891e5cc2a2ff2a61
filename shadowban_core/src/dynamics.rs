//! The "Dynamics" engine - bounded-confidence opinion flow under suppression.
//!
//! Opinions evolve as
//!
//! ```text
//! dx_j/dt = Σ_{e=(i,j)} u_e · rate_j · shift((x_i - x_j) · f_e)
//! ```
//!
//! where `u_e` is the edge's suppression multiplier and `f_e` the experiment
//! damping factor (1 unless the experiment is emulated). Integration is
//! classical RK4 with a fixed step, followed by clamping to `[0, 1]`.

use nalgebra::DVector;
use shadowban_env::{ControlStep, OpinionEnv, SimError, SimResult, SimStep};
use tracing::debug;

use crate::control::ControlOptimizer;
use crate::graph::InfluenceGraph;
use crate::params::SimParams;
use crate::perturbation::experiment_factors;

/// Borrowed view of everything the right-hand side depends on.
struct SlopeField<'a> {
    graph: &'a InfluenceGraph,
    params: &'a SimParams,
    factors: &'a DVector<f64>,
}

impl SlopeField<'_> {
    /// Writes the opinion velocity at `state` into `out`.
    fn eval(
        &self,
        state: &DVector<f64>,
        control: &DVector<f64>,
        edges: &mut EdgeScratch,
        out: &mut DVector<f64>,
    ) -> SimResult<()> {
        for (e, edge) in self.graph.edges().iter().enumerate() {
            edges.deltas[e] = (state[edge.source] - state[edge.target]) * self.factors[e];
        }
        self.params.kernel.shift_into(
            edges.deltas.as_slice(),
            self.params.tau,
            self.params.omega,
            edges.influence.as_mut_slice(),
        )?;

        out.fill(0.0);
        let rates = self.graph.rates();
        for (e, edge) in self.graph.edges().iter().enumerate() {
            out[edge.target] += control[e] * rates[edge.target] * edges.influence[e];
        }
        Ok(())
    }
}

/// Per-edge buffers of one slope evaluation.
#[derive(Debug, Clone, Default)]
struct EdgeScratch {
    deltas: DVector<f64>,
    influence: DVector<f64>,
}

impl EdgeScratch {
    fn new(num_edges: usize) -> Self {
        Self {
            deltas: DVector::zeros(num_edges),
            influence: DVector::zeros(num_edges),
        }
    }
}

/// RK4 stage buffers, sized to the graph once.
#[derive(Debug, Clone, Default)]
struct Rk4Scratch {
    k1: DVector<f64>,
    k2: DVector<f64>,
    k3: DVector<f64>,
    k4: DVector<f64>,
    stage: DVector<f64>,
    edges: EdgeScratch,
}

impl Rk4Scratch {
    fn new(num_vertices: usize, num_edges: usize) -> Self {
        Self {
            edges: EdgeScratch::new(num_edges),
            k1: DVector::zeros(num_vertices),
            k2: DVector::zeros(num_vertices),
            k3: DVector::zeros(num_vertices),
            k4: DVector::zeros(num_vertices),
            stage: DVector::zeros(num_vertices),
        }
    }
}

/// Live opinion state on a fixed graph, stepped interval by interval.
#[derive(Debug, Clone)]
pub struct DynamicsState {
    params: SimParams,
    graph: InfluenceGraph,
    optimizer: ControlOptimizer,

    opinions_initial: DVector<f64>,
    opinions: DVector<f64>,

    /// Experiment damping per edge, recomputed at every reset
    edge_factors: DVector<f64>,

    /// Control intervals issued since the last reset
    control_step_counter: usize,

    /// Inner steps taken in the open interval
    sim_step_counter: usize,

    /// True between a control step and the last inner step of its interval
    interval_open: bool,

    scratch: Rk4Scratch,
}

impl DynamicsState {
    /// Creates a dynamics state in its reset configuration.
    ///
    /// Fails if the parameters are out of range, or if `opinions0` does not
    /// match the graph or leaves `[0, 1]`.
    pub fn new(graph: InfluenceGraph, opinions0: DVector<f64>, params: SimParams) -> SimResult<Self> {
        params.validate()?;

        let nv = graph.num_vertices();
        if opinions0.len() != nv {
            return Err(SimError::dimension("opinions0", nv, opinions0.len()));
        }
        if let Some(x) = opinions0.iter().find(|x| !(0.0..=1.0).contains(*x)) {
            return Err(SimError::invalid(format!("initial opinion {} outside [0, 1]", x)));
        }

        let mut state = Self {
            optimizer: ControlOptimizer::new(&params),
            edge_factors: DVector::from_element(graph.num_edges(), 1.0),
            opinions: opinions0.clone(),
            opinions_initial: opinions0,
            control_step_counter: 0,
            sim_step_counter: 0,
            interval_open: false,
            scratch: Rk4Scratch::new(nv, graph.num_edges()),
            params,
            graph,
        };
        state.reset();
        Ok(state)
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn graph(&self) -> &InfluenceGraph {
        &self.graph
    }

    /// Current opinions.
    pub fn opinions(&self) -> &DVector<f64> {
        &self.opinions
    }

    /// Opinions the state resets to.
    pub fn initial_opinions(&self) -> &DVector<f64> {
        &self.opinions_initial
    }

    /// Experiment damping factors currently applied per edge.
    pub fn edge_factors(&self) -> &DVector<f64> {
        &self.edge_factors
    }

    pub fn control_step_counter(&self) -> usize {
        self.control_step_counter
    }

    pub fn sim_step_counter(&self) -> usize {
        self.sim_step_counter
    }

    /// Opinion velocity at `state` under `control`.
    pub fn derivative(&self, state: &DVector<f64>, control: &DVector<f64>) -> SimResult<DVector<f64>> {
        self.check_lengths(state, control)?;
        let mut out = DVector::zeros(self.graph.num_vertices());
        let mut edges = EdgeScratch::new(self.graph.num_edges());
        self.field().eval(state, control, &mut edges, &mut out)?;
        Ok(out)
    }

    fn field(&self) -> SlopeField<'_> {
        SlopeField {
            graph: &self.graph,
            params: &self.params,
            factors: &self.edge_factors,
        }
    }

    fn check_lengths(&self, state: &DVector<f64>, control: &DVector<f64>) -> SimResult<()> {
        if state.len() != self.graph.num_vertices() {
            return Err(SimError::dimension("opinions", self.graph.num_vertices(), state.len()));
        }
        if control.len() != self.graph.num_edges() {
            return Err(SimError::dimension("control", self.graph.num_edges(), control.len()));
        }
        Ok(())
    }

    /// One RK4 step of length `dt` on the live opinions, then clamp.
    fn integrate(&mut self, control: &DVector<f64>) -> SimResult<()> {
        let mut s = std::mem::take(&mut self.scratch);
        let result = self.rk4_into(control, &mut s);
        if result.is_ok() {
            self.opinions.copy_from(&s.stage);
        }
        self.scratch = s;
        result
    }

    /// Writes the clamped RK4 successor of the live opinions into `s.stage`.
    fn rk4_into(&self, control: &DVector<f64>, s: &mut Rk4Scratch) -> SimResult<()> {
        let dt = self.params.dt();
        let field = self.field();
        let x = &self.opinions;
        let n = x.len();

        field.eval(x, control, &mut s.edges, &mut s.k1)?;
        for v in 0..n {
            s.stage[v] = x[v] + dt / 2.0 * s.k1[v];
        }
        field.eval(&s.stage, control, &mut s.edges, &mut s.k2)?;
        for v in 0..n {
            s.stage[v] = x[v] + dt / 2.0 * s.k2[v];
        }
        field.eval(&s.stage, control, &mut s.edges, &mut s.k3)?;
        for v in 0..n {
            s.stage[v] = x[v] + dt * s.k3[v];
        }
        field.eval(&s.stage, control, &mut s.edges, &mut s.k4)?;

        for v in 0..n {
            let slope = (s.k1[v] + 2.0 * s.k2[v] + 2.0 * s.k3[v] + s.k4[v]) / 6.0;
            s.stage[v] = (x[v] + slope * dt).clamp(0.0, 1.0);
        }
        Ok(())
    }
}

impl OpinionEnv for DynamicsState {
    fn num_vertices(&self) -> usize {
        self.graph.num_vertices()
    }

    fn num_edges(&self) -> usize {
        self.graph.num_edges()
    }

    fn control_steps(&self) -> usize {
        self.params.control_steps
    }

    fn sim_steps(&self) -> usize {
        self.params.sim_steps
    }

    fn reset(&mut self) -> DVector<f64> {
        self.control_step_counter = 0;
        self.sim_step_counter = 0;
        self.interval_open = false;
        self.opinions.copy_from(&self.opinions_initial);

        self.edge_factors = if self.params.experiment {
            experiment_factors(&self.opinions_initial, &self.graph)
        } else {
            DVector::from_element(self.graph.num_edges(), 1.0)
        };

        self.opinions_initial.clone()
    }

    fn control_step(&mut self, state: &DVector<f64>) -> SimResult<ControlStep> {
        if self.control_step_counter >= self.params.control_steps || self.interval_open {
            return Err(SimError::StepOutOfSequence {
                operation: "control_step",
                interval: self.control_step_counter,
                step: self.sim_step_counter,
            });
        }
        if state.len() != self.graph.num_vertices() {
            return Err(SimError::dimension("opinions", self.graph.num_vertices(), state.len()));
        }

        let (control, gradient) = if self.params.shadowban {
            let solution = self.optimizer.solve(&self.graph, state, self.params.objective)?;
            (solution.control, Some(solution.coefficients))
        } else {
            (DVector::from_element(self.graph.num_edges(), 1.0), None)
        };

        debug!(
            "interval {} | mean control={:.4}",
            self.control_step_counter,
            if control.is_empty() { 1.0 } else { control.mean() }
        );

        self.control_step_counter += 1;
        self.sim_step_counter = 0;
        self.interval_open = true;

        Ok(ControlStep {
            control,
            done: self.control_step_counter >= self.params.control_steps,
            gradient,
        })
    }

    fn sim_step(&mut self, control: &DVector<f64>) -> SimResult<SimStep> {
        if !self.interval_open {
            return Err(SimError::StepOutOfSequence {
                operation: "sim_step",
                interval: self.control_step_counter,
                step: self.sim_step_counter,
            });
        }
        if control.len() != self.graph.num_edges() {
            return Err(SimError::dimension("control", self.graph.num_edges(), control.len()));
        }

        self.integrate(control)?;

        self.sim_step_counter += 1;
        let done = self.sim_step_counter >= self.params.sim_steps;
        if done {
            self.sim_step_counter = 0;
            self.interval_open = false;
        }

        Ok(SimStep {
            state: self.opinions.clone(),
            done,
        })
    }
}
