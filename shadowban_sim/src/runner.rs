//! Simulation driver - runs the nested control/integration loop.

use nalgebra::DMatrix;
use shadowban_core::metrics::TrajectorySummary;
use shadowban_core::{evaluate, DynamicsState, SimParams};
use shadowban_env::{OpinionEnv, SimError, SimResult};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Recorded opinion and control histories of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// `(sim_steps * control_steps + 1) x nv`, row 0 is the initial state
    pub opinions: DMatrix<f64>,

    /// `control_steps x ne`, one row per interval
    pub controls: DMatrix<f64>,
}

/// Results from a scored run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Parameters the run used
    pub params: SimParams,

    /// Recorded histories
    pub trajectory: Trajectory,

    /// Objective value (lower is better for the controller)
    pub objective_value: f64,

    /// Sample times, evenly spaced over `[0, control_steps]`
    pub time: Vec<f64>,

    /// First/last sample statistics
    pub summary: TrajectorySummary,

    /// Wall time of the run
    pub elapsed: Duration,
}

/// Evenly spaced sample times: `control_steps * sim_steps + 1` points over
/// `[0, control_steps]`.
pub fn time_axis(control_steps: usize, sim_steps: usize) -> Vec<f64> {
    let samples = control_steps * sim_steps;
    if samples == 0 {
        return vec![0.0];
    }
    let horizon = control_steps as f64;
    (0..=samples)
        .map(|i| horizon * i as f64 / samples as f64)
        .collect()
}

/// Runs an [`OpinionEnv`] through `RESET → (CONTROL → STEP × sim_steps) × control_steps`.
#[derive(Debug, Clone, Default)]
pub struct SimulationDriver {
    /// Control-usage weight in the objective
    alpha: f64,
}

impl SimulationDriver {
    /// Creates a driver that scores without control penalty.
    pub fn new() -> Self {
        Self { alpha: 0.0 }
    }

    /// Sets the control-usage weight used by [`run_scored`](Self::run_scored).
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Runs the environment from reset and records every sample.
    ///
    /// Errors from the environment are tagged with the interval and inner
    /// step they occurred at. The buffers are sized up front; an environment
    /// that over- or under-runs its declared step counts is an error.
    pub fn run<E: OpinionEnv>(&self, env: &mut E) -> SimResult<Trajectory> {
        let nv = env.num_vertices();
        let ne = env.num_edges();
        let control_steps = env.control_steps();
        let sim_steps = env.sim_steps();
        let num_samples = sim_steps * control_steps + 1;

        let mut opinions = DMatrix::zeros(num_samples, nv);
        let mut controls = DMatrix::zeros(control_steps, ne);

        let mut state = env.reset();
        if state.len() != nv {
            return Err(SimError::dimension("opinions", nv, state.len()));
        }
        opinions.set_row(0, &state.transpose());

        let mut opinion_index = 1;
        let mut control_index = 0;

        loop {
            if control_index >= control_steps {
                return Err(SimError::StepOutOfSequence {
                    operation: "control_step",
                    interval: control_index,
                    step: 0,
                });
            }

            let step = env
                .control_step(&state)
                .map_err(|e| e.at(control_index, 0))?;
            if step.control.len() != ne {
                return Err(SimError::dimension("control", ne, step.control.len()).at(control_index, 0));
            }
            controls.set_row(control_index, &step.control.transpose());

            let mut inner = 0;
            loop {
                if opinion_index >= num_samples {
                    return Err(SimError::StepOutOfSequence {
                        operation: "sim_step",
                        interval: control_index,
                        step: inner,
                    });
                }

                let sim = env
                    .sim_step(&step.control)
                    .map_err(|e| e.at(control_index, inner))?;
                if sim.state.len() != nv {
                    return Err(SimError::dimension("opinions", nv, sim.state.len()).at(control_index, inner));
                }
                opinions.set_row(opinion_index, &sim.state.transpose());
                opinion_index += 1;
                inner += 1;
                state = sim.state;

                if sim.done {
                    break;
                }
            }

            debug!("  interval {}/{} | {} inner steps", control_index + 1, control_steps, inner);
            control_index += 1;

            if step.done {
                break;
            }
        }

        if opinion_index != num_samples {
            return Err(SimError::dimension("opinion samples", num_samples, opinion_index));
        }
        if control_index != control_steps {
            return Err(SimError::dimension("control samples", control_steps, control_index));
        }

        Ok(Trajectory { opinions, controls })
    }

    /// Runs a dynamics state and scores the trajectory with its objective.
    pub fn run_scored(&self, dynamics: &mut DynamicsState) -> SimResult<RunResult> {
        let params = dynamics.params().clone();
        let started = Instant::now();

        let trajectory = self.run(dynamics)?;
        let objective_value = evaluate(
            params.objective,
            &trajectory.opinions,
            Some(&trajectory.controls),
            params.thres,
            self.alpha,
        );
        let summary = TrajectorySummary::from_trajectories(
            &trajectory.opinions,
            &trajectory.controls,
            params.thres,
        );
        let elapsed = started.elapsed();

        info!(
            "Took {:.2}s to simulate {} Tf={} smax={:.2} sedge={:.2}, obj={:.4}",
            elapsed.as_secs_f64(),
            params.objective,
            params.control_steps,
            params.smax,
            params.sedge,
            objective_value.abs()
        );

        Ok(RunResult {
            time: time_axis(params.control_steps, params.sim_steps),
            params,
            trajectory,
            objective_value,
            summary,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::DVector;
    use shadowban_core::InfluenceGraph;
    use shadowban_env::{ControlStep, Edge, ObjectiveMode, SimStep};

    fn triangle() -> InfluenceGraph {
        let edges = vec![Edge::new(0, 1), Edge::new(1, 0), Edge::new(1, 2)];
        InfluenceGraph::with_uniform_rate(3, edges, 1.0).unwrap()
    }

    fn opinions() -> DVector<f64> {
        DVector::from_vec(vec![0.2, 0.5, 0.8])
    }

    fn params() -> SimParams {
        SimParams::default()
            .with_kernel(0.5, 1.0)
            .with_steps(2, 2)
            .with_suppression(0.0, 0.0)
    }

    /// Plain RK4 on the unsuppressed dynamics, independent of the driver.
    fn reference_rk4(dynamics: &DynamicsState, steps: usize, dt: f64) -> Vec<DVector<f64>> {
        let ones = DVector::from_element(dynamics.graph().num_edges(), 1.0);
        let f = |x: &DVector<f64>| dynamics.derivative(x, &ones).unwrap();
        let mut x = dynamics.initial_opinions().clone();
        let mut out = vec![x.clone()];
        for _ in 0..steps {
            let k1 = f(&x);
            let k2 = f(&(&x + &k1 * (dt / 2.0)));
            let k3 = f(&(&x + &k2 * (dt / 2.0)));
            let k4 = f(&(&x + &k3 * dt));
            x = (&x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)).map(|v| v.clamp(0.0, 1.0));
            out.push(x.clone());
        }
        out
    }

    #[test]
    fn test_time_axis() {
        let t = time_axis(2, 4);
        assert_eq!(t.len(), 9);
        assert_eq!(t[0], 0.0);
        assert_eq!(t[8], 2.0);
        assert_abs_diff_eq!(t[1], 0.25, epsilon = 1e-15);
    }

    #[test]
    fn test_trajectory_shape() {
        let mut dynamics = DynamicsState::new(triangle(), opinions(), params().with_steps(3, 5)).unwrap();
        let trajectory = SimulationDriver::new().run(&mut dynamics).unwrap();

        assert_eq!(trajectory.opinions.shape(), (16, 3));
        assert_eq!(trajectory.controls.shape(), (3, 3));
        assert_eq!(trajectory.opinions.row(0).transpose(), opinions());
    }

    #[test]
    fn test_no_suppression_matches_direct_rk4() {
        for shadowban in [true, false] {
            for objective in [ObjectiveMode::Mean, ObjectiveMode::VarMax, ObjectiveMode::VarMin] {
                let p = params().with_shadowban(shadowban).with_objective(objective);
                let mut dynamics = DynamicsState::new(triangle(), opinions(), p).unwrap();
                let trajectory = SimulationDriver::new().run(&mut dynamics).unwrap();

                assert_eq!(trajectory.controls, DMatrix::from_element(2, 3, 1.0));

                let expected = reference_rk4(&dynamics, 4, 0.5);
                for (i, x) in expected.iter().enumerate() {
                    let row = trajectory.opinions.row(i).transpose();
                    assert_abs_diff_eq!(row, x.clone(), epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_full_ban_freezes_trajectory() {
        let p = params().with_suppression(1.0, 1.0);
        let mut dynamics = DynamicsState::new(triangle(), opinions(), p).unwrap();
        let trajectory = SimulationDriver::new().run(&mut dynamics).unwrap();

        assert_eq!(trajectory.controls, DMatrix::zeros(2, 3));
        for row in trajectory.opinions.row_iter() {
            assert_eq!(row.transpose(), opinions());
        }
    }

    #[test]
    fn test_control_bounds_hold() {
        let p = params()
            .with_steps(3, 4)
            .with_suppression(0.3, 0.6)
            .with_objective(ObjectiveMode::VarMax);
        let mut dynamics = DynamicsState::new(triangle(), opinions(), p).unwrap();
        let trajectory = SimulationDriver::new().run(&mut dynamics).unwrap();

        for row in trajectory.controls.row_iter() {
            assert!(row.iter().all(|u| (0.4 - 1e-12..=1.0).contains(u)));
            assert!(row.sum() <= 3.0 * 0.7 + 1e-9);
        }
    }

    #[test]
    fn test_runs_are_deterministic() {
        let p = params().with_steps(4, 6).with_suppression(0.2, 0.5);
        let driver = SimulationDriver::new();

        let mut first = DynamicsState::new(triangle(), opinions(), p.clone()).unwrap();
        let mut second = DynamicsState::new(triangle(), opinions(), p).unwrap();

        let a = driver.run(&mut first).unwrap();
        let b = driver.run(&mut second).unwrap();
        assert_eq!(a, b);

        // rerunning the same state starts again from reset
        let c = driver.run(&mut first).unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn test_infeasible_control_reports_interval() {
        let p = params().with_suppression(0.5, 0.1);
        let mut dynamics = DynamicsState::new(triangle(), opinions(), p).unwrap();
        let err = SimulationDriver::new().run(&mut dynamics).unwrap_err();

        assert!(matches!(err, SimError::Run { interval: 0, step: 0, .. }));
        assert!(matches!(err.root(), SimError::InfeasibleControl { num_edges: 3, .. }));
    }

    #[test]
    fn test_run_scored() {
        let mut dynamics = DynamicsState::new(triangle(), opinions(), params()).unwrap();
        let result = SimulationDriver::new().run_scored(&mut dynamics).unwrap();

        assert_eq!(result.time.len(), 5);
        let expected = evaluate(
            ObjectiveMode::Mean,
            &result.trajectory.opinions,
            None,
            0.7,
            0.0,
        );
        assert_abs_diff_eq!(result.objective_value, expected, epsilon = 1e-12);
        assert_abs_diff_eq!(result.summary.mean_suppression, 0.0, epsilon = 1e-12);
    }

    /// Environment that never reports the end of its intervals.
    struct RunawayEnv;

    impl OpinionEnv for RunawayEnv {
        fn num_vertices(&self) -> usize { 1 }
        fn num_edges(&self) -> usize { 0 }
        fn control_steps(&self) -> usize { 1 }
        fn sim_steps(&self) -> usize { 2 }

        fn reset(&mut self) -> DVector<f64> {
            DVector::from_element(1, 0.5)
        }

        fn control_step(&mut self, _state: &DVector<f64>) -> SimResult<ControlStep> {
            Ok(ControlStep { control: DVector::zeros(0), done: false, gradient: None })
        }

        fn sim_step(&mut self, _control: &DVector<f64>) -> SimResult<SimStep> {
            Ok(SimStep { state: DVector::from_element(1, 0.5), done: false })
        }
    }

    #[test]
    fn test_overrunning_env_rejected() {
        let err = SimulationDriver::new().run(&mut RunawayEnv).unwrap_err();
        assert!(matches!(err, SimError::StepOutOfSequence { operation: "sim_step", .. }));
    }
}
