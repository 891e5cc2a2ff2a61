//! Trajectory statistics
//! =====================
//!
//! Per-time summaries of an opinion trajectory (one row per sample) and of a
//! control trajectory (one row per interval):
//! - **Mean / variance**: population moments across vertices
//! - **Extremist fraction**: share of vertices at or above a threshold
//! - **Quantiles**: linear-interpolated percentiles, the bands of a quantile plot
//! - **Suppression strength**: `1 - mean(control)`, the mean shadow-ban depth

use nalgebra::{DMatrix, RowDVector};
use serde::{Deserialize, Serialize};

/// Percentiles reported by default (median, quartiles, 5/95 tails).
pub const DEFAULT_QUANTILES: [f64; 5] = [50.0, 25.0, 75.0, 5.0, 95.0];

/// Mean of a row; zero for an empty row.
pub fn row_mean(row: &RowDVector<f64>) -> f64 {
    if row.is_empty() {
        0.0
    } else {
        row.sum() / row.len() as f64
    }
}

/// Population variance of a row; zero for an empty row.
pub fn row_variance(row: &RowDVector<f64>) -> f64 {
    if row.is_empty() {
        return 0.0;
    }
    let mean = row_mean(row);
    row.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / row.len() as f64
}

/// Share of entries at or above `thres`; zero for an empty row.
pub fn row_extreme_fraction(row: &RowDVector<f64>, thres: f64) -> f64 {
    if row.is_empty() {
        return 0.0;
    }
    row.iter().filter(|&&x| x >= thres).count() as f64 / row.len() as f64
}

/// Mean opinion at each sample.
pub fn mean_per_time(opinions: &DMatrix<f64>) -> Vec<f64> {
    opinions.row_iter().map(|r| row_mean(&r.into_owned())).collect()
}

/// Opinion variance at each sample.
pub fn variance_per_time(opinions: &DMatrix<f64>) -> Vec<f64> {
    opinions.row_iter().map(|r| row_variance(&r.into_owned())).collect()
}

/// Extremist fraction at each sample.
pub fn extreme_fraction_per_time(opinions: &DMatrix<f64>, thres: f64) -> Vec<f64> {
    opinions
        .row_iter()
        .map(|r| row_extreme_fraction(&r.into_owned(), thres))
        .collect()
}

/// Percentile `q` (0..=100) of already sorted values, linearly interpolated
/// between closest ranks.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = (q / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Percentiles of every sample; `result[k][t]` is quantile `qs[k]` at time `t`.
pub fn quantiles_per_time(opinions: &DMatrix<f64>, qs: &[f64]) -> Vec<Vec<f64>> {
    let mut bands = vec![Vec::with_capacity(opinions.nrows()); qs.len()];
    for row in opinions.row_iter() {
        let mut sorted: Vec<f64> = row.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        for (band, &q) in bands.iter_mut().zip(qs) {
            band.push(percentile_sorted(&sorted, q));
        }
    }
    bands
}

/// Mean control multiplier per interval (1 when a row is empty).
pub fn mean_control_per_interval(controls: &DMatrix<f64>) -> Vec<f64> {
    controls
        .row_iter()
        .map(|r| if r.is_empty() { 1.0 } else { r.sum() / r.len() as f64 })
        .collect()
}

/// Mean shadow-ban strength per interval, `1 - mean(control)`.
pub fn suppression_strength(controls: &DMatrix<f64>) -> Vec<f64> {
    mean_control_per_interval(controls)
        .into_iter()
        .map(|m| 1.0 - m)
        .collect()
}

/// End-of-run summary of a trajectory pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySummary {
    pub initial_mean: f64,
    pub final_mean: f64,
    pub initial_variance: f64,
    pub final_variance: f64,
    pub final_extreme_fraction: f64,
    /// Average of the per-interval suppression strength
    pub mean_suppression: f64,
}

impl TrajectorySummary {
    /// Summarizes the first and last opinion samples and the controls.
    pub fn from_trajectories(opinions: &DMatrix<f64>, controls: &DMatrix<f64>, thres: f64) -> Self {
        if opinions.nrows() == 0 {
            return Self::default();
        }
        let first = opinions.row(0).into_owned();
        let last = opinions.row(opinions.nrows() - 1).into_owned();
        let strength = suppression_strength(controls);
        let mean_suppression = if strength.is_empty() {
            0.0
        } else {
            strength.iter().sum::<f64>() / strength.len() as f64
        };

        Self {
            initial_mean: row_mean(&first),
            final_mean: row_mean(&last),
            initial_variance: row_variance(&first),
            final_variance: row_variance(&last),
            final_extreme_fraction: row_extreme_fraction(&last, thres),
            mean_suppression,
        }
    }
}
