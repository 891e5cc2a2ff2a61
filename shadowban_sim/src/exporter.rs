//! JSON exporter for run results.
//!
//! Each run produces two documents in `{out}/{OBJECTIVE}/`: the run file with
//! the time axis, objective value and opinion trajectory, and an
//! `_allcontrols` file with the full per-edge control trajectory.

use crate::runner::RunResult;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use shadowban_core::metrics::{mean_control_per_interval, quantiles_per_time, DEFAULT_QUANTILES};
use shadowban_core::{SimParams, TrajectorySummary};
use shadowban_env::{SimError, SimResult};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// File stem for a run, e.g.
/// `Shadow_Ban_MEAN_shift_HK_tau=0.5_omega=1.0_smax=0.1_sedge=0.5_expr=false_Tf=10`.
pub fn file_stem(params: &SimParams) -> String {
    format!(
        "Shadow_Ban_{}_{}_tau={:?}_omega={:?}_smax={:?}_sedge={:?}_expr={}_Tf={}",
        params.objective,
        params.kernel,
        params.tau,
        params.omega,
        params.smax,
        params.sedge,
        params.experiment,
        params.control_steps
    )
}

fn rows(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|r| r.iter().copied().collect())
        .collect()
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> SimResult<()> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| SimError::Serialization(e.to_string()))?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

/// Run file: scalar results plus the opinion trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    pub params: SimParams,

    /// Sample times
    pub time: Vec<f64>,

    pub objective_value: f64,

    /// One row per sample, one column per vertex
    pub opinions: Vec<Vec<f64>>,

    /// Mean control multiplier per interval
    pub mean_control: Vec<f64>,

    /// Opinion percentiles per sample, `quantiles[k][t]`
    pub quantile_levels: Vec<f64>,
    pub quantiles: Vec<Vec<f64>>,

    pub summary: TrajectorySummary,

    /// Wall time of the run in seconds
    pub elapsed_secs: f64,
}

impl RunExport {
    /// Creates the run document from a finished run.
    pub fn new(result: &RunResult) -> Self {
        let trajectory = &result.trajectory;
        Self {
            params: result.params.clone(),
            time: result.time.clone(),
            objective_value: result.objective_value,
            opinions: rows(&trajectory.opinions),
            mean_control: mean_control_per_interval(&trajectory.controls),
            quantile_levels: DEFAULT_QUANTILES.to_vec(),
            quantiles: quantiles_per_time(&trajectory.opinions, &DEFAULT_QUANTILES),
            summary: result.summary.clone(),
            elapsed_secs: result.elapsed.as_secs_f64(),
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> SimResult<()> {
        write_json(self, path.as_ref())
    }
}

/// `_allcontrols` file: the full control trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlsExport {
    /// `(following, follower)` per control column
    pub edges: Vec<(usize, usize)>,

    /// One row per interval, one column per edge
    pub controls: Vec<Vec<f64>>,
}

impl ControlsExport {
    pub fn new(result: &RunResult, edges: Vec<(usize, usize)>) -> Self {
        Self {
            edges,
            controls: rows(&result.trajectory.controls),
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> SimResult<()> {
        write_json(self, path.as_ref())
    }
}

/// Writes both documents of a run under `out/{OBJECTIVE}/`, returning the run
/// file path.
pub fn write_run(out: impl AsRef<Path>, result: &RunResult, edges: Vec<(usize, usize)>) -> SimResult<PathBuf> {
    let dir = out.as_ref().join(result.params.objective.name());
    fs::create_dir_all(&dir)?;

    let stem = file_stem(&result.params);
    let run_path = dir.join(format!("{}.json", stem));
    RunExport::new(result).write_to_file(&run_path)?;
    ControlsExport::new(result, edges).write_to_file(dir.join(format!("{}_allcontrols.json", stem)))?;

    Ok(run_path)
}
