//! Trajectory scoring.
//!
//! The score of a run is the time average of a control-usage cost plus the
//! time average of an opinion cost, both signed so that lower is better for
//! the controller.

use nalgebra::DMatrix;
use shadowban_env::ObjectiveMode;

use crate::metrics::{
    extreme_fraction_per_time, mean_control_per_interval, mean_per_time, variance_per_time,
};

fn time_average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Scores an opinion trajectory and its controls.
///
/// * `opinions` - one row per sample, one column per vertex
/// * `controls` - one row per interval; `None` scores as all-ones control
/// * `thres` - extremism threshold for EXTMAX / EXTMIN
/// * `alpha` - weight of the control-usage penalty `-alpha * mean(control)`
pub fn evaluate(
    mode: ObjectiveMode,
    opinions: &DMatrix<f64>,
    controls: Option<&DMatrix<f64>>,
    thres: f64,
    alpha: f64,
) -> f64 {
    let control_cost = match controls {
        Some(u) if u.ncols() > 0 => {
            let per_interval: Vec<f64> = mean_control_per_interval(u)
                .into_iter()
                .map(|m| -alpha * m)
                .collect();
            time_average(&per_interval)
        }
        Some(_) => 0.0,
        None => -alpha,
    };

    let opinion_cost = match mode {
        ObjectiveMode::Mean => -time_average(&mean_per_time(opinions)),
        ObjectiveMode::VarMax => -time_average(&variance_per_time(opinions)),
        ObjectiveMode::VarMin => time_average(&variance_per_time(opinions)),
        ObjectiveMode::ExtMax => -time_average(&extreme_fraction_per_time(opinions, thres)),
        ObjectiveMode::ExtMin => time_average(&extreme_fraction_per_time(opinions, thres)),
    };

    control_cost + opinion_cost
}
