//! Parameter sweeps over objectives and suppression budgets.
//!
//! Every configuration owns a fresh [`DynamicsState`], so runs share nothing
//! and can be spread over tokio's blocking pool.

use crate::runner::{RunResult, SimulationDriver};
use nalgebra::DVector;
use shadowban_core::{DynamicsState, InfluenceGraph, SimParams};
use shadowban_env::{ObjectiveMode, SimError, SimResult};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one sweep configuration.
#[derive(Debug)]
pub struct SweepOutcome {
    pub params: SimParams,
    pub result: SimResult<RunResult>,
}

impl SweepOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs one network through every `(objective, smax, sedge)` combination.
#[derive(Debug, Clone)]
pub struct SweepRunner {
    graph: Arc<InfluenceGraph>,
    opinions0: Arc<DVector<f64>>,
    base: SimParams,
    objectives: Vec<ObjectiveMode>,
    smax_range: Vec<f64>,
    sedge_range: Vec<f64>,
    driver: SimulationDriver,
}

impl SweepRunner {
    /// Creates a sweep with the base parameters as its only configuration.
    pub fn new(graph: InfluenceGraph, opinions0: DVector<f64>, base: SimParams) -> Self {
        Self {
            objectives: vec![base.objective],
            smax_range: vec![base.smax],
            sedge_range: vec![base.sedge],
            graph: Arc::new(graph),
            opinions0: Arc::new(opinions0),
            base,
            driver: SimulationDriver::new(),
        }
    }

    pub fn with_objectives(mut self, objectives: Vec<ObjectiveMode>) -> Self {
        self.objectives = objectives;
        self
    }

    pub fn with_smax_range(mut self, smax: Vec<f64>) -> Self {
        self.smax_range = smax;
        self
    }

    pub fn with_sedge_range(mut self, sedge: Vec<f64>) -> Self {
        self.sedge_range = sedge;
        self
    }

    pub fn with_driver(mut self, driver: SimulationDriver) -> Self {
        self.driver = driver;
        self
    }

    pub fn graph(&self) -> &InfluenceGraph {
        &self.graph
    }

    /// All configurations in sweep order: objective, then smax, then sedge.
    pub fn configurations(&self) -> Vec<SimParams> {
        let mut configs =
            Vec::with_capacity(self.objectives.len() * self.smax_range.len() * self.sedge_range.len());
        for &objective in &self.objectives {
            for &smax in &self.smax_range {
                for &sedge in &self.sedge_range {
                    configs.push(
                        self.base
                            .clone()
                            .with_objective(objective)
                            .with_suppression(smax, sedge),
                    );
                }
            }
        }
        configs
    }

    /// Runs every configuration in order on the calling thread.
    pub fn run(&self) -> Vec<SweepOutcome> {
        let configs = self.configurations();
        info!("Sweeping {} configurations", configs.len());

        configs
            .into_iter()
            .map(|params| {
                let result = run_one(&self.driver, &self.graph, &self.opinions0, &params);
                log_outcome(&params, &result);
                SweepOutcome { params, result }
            })
            .collect()
    }

    /// Runs every configuration on the blocking pool; outcomes keep sweep order.
    pub async fn run_parallel(&self) -> Vec<SweepOutcome> {
        let configs = self.configurations();
        info!("Sweeping {} configurations in parallel", configs.len());

        let handles: Vec<_> = configs
            .into_iter()
            .map(|params| {
                let driver = self.driver.clone();
                let graph = Arc::clone(&self.graph);
                let opinions0 = Arc::clone(&self.opinions0);
                let task_params = params.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    run_one(&driver, &graph, &opinions0, &task_params)
                });
                (params, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (params, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(SimError::Worker(e.to_string())),
            };
            log_outcome(&params, &result);
            outcomes.push(SweepOutcome { params, result });
        }
        outcomes
    }
}

fn run_one(
    driver: &SimulationDriver,
    graph: &InfluenceGraph,
    opinions0: &DVector<f64>,
    params: &SimParams,
) -> SimResult<RunResult> {
    let mut dynamics = DynamicsState::new(graph.clone(), opinions0.clone(), params.clone())?;
    driver.run_scored(&mut dynamics)
}

fn log_outcome(params: &SimParams, result: &SimResult<RunResult>) {
    match result {
        Ok(run) => info!(
            "✓ {} smax={:.2} sedge={:.2} obj={:.4}",
            params.objective, params.smax, params.sedge, run.objective_value
        ),
        Err(e) => warn!(
            "✗ {} smax={:.2} sedge={:.2}: {}",
            params.objective, params.smax, params.sedge, e
        ),
    }
}
