//! Common types for the shadow-ban simulation environment.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// A directed influence edge.
///
/// `source` is the influencing ("following") vertex, `target` the influenced
/// ("follower") vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
}

impl Edge {
    pub fn new(source: usize, target: usize) -> Self {
        Self { source, target }
    }
}

impl From<(usize, usize)> for Edge {
    fn from((source, target): (usize, usize)) -> Self {
        Self { source, target }
    }
}

/// Scalar statistic of a trajectory that is scored or optimized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObjectiveMode {
    /// Push the mean opinion up
    Mean,

    /// Maximize opinion variance (polarize)
    VarMax,

    /// Minimize opinion variance (consensus)
    VarMin,

    /// Maximize the fraction of opinions at or above the threshold
    ExtMax,

    /// Minimize the fraction of opinions at or above the threshold
    ExtMin,
}

impl ObjectiveMode {
    /// Returns all objective modes.
    pub fn all() -> Vec<ObjectiveMode> {
        vec![
            ObjectiveMode::Mean,
            ObjectiveMode::VarMax,
            ObjectiveMode::VarMin,
            ObjectiveMode::ExtMax,
            ObjectiveMode::ExtMin,
        ]
    }

    /// Returns the canonical upper-case name.
    pub fn name(&self) -> &'static str {
        match self {
            ObjectiveMode::Mean => "MEAN",
            ObjectiveMode::VarMax => "VARMAX",
            ObjectiveMode::VarMin => "VARMIN",
            ObjectiveMode::ExtMax => "EXTMAX",
            ObjectiveMode::ExtMin => "EXTMIN",
        }
    }

    /// Returns true if the control optimizer has a linear sensitivity for
    /// this mode. Extremism fractions are piecewise constant in the opinions.
    pub fn is_differentiable(&self) -> bool {
        matches!(
            self,
            ObjectiveMode::Mean | ObjectiveMode::VarMax | ObjectiveMode::VarMin
        )
    }
}

impl std::fmt::Display for ObjectiveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ObjectiveMode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MEAN" => Ok(ObjectiveMode::Mean),
            "VARMAX" => Ok(ObjectiveMode::VarMax),
            "VARMIN" => Ok(ObjectiveMode::VarMin),
            "EXTMAX" => Ok(ObjectiveMode::ExtMax),
            "EXTMIN" => Ok(ObjectiveMode::ExtMin),
            _ => Err(SimError::UnknownObjective(format!(
                "{} (choose from MEAN, VARMAX, VARMIN, EXTMAX, EXTMIN)",
                s
            ))),
        }
    }
}

/// Output of one control interval decision.
#[derive(Debug, Clone)]
pub struct ControlStep {
    /// Suppression multiplier per edge, each in `[1 - sedge, 1]`
    pub control: DVector<f64>,

    /// True once the last control interval has been issued
    pub done: bool,

    /// Rounded LP cost vector, absent when suppression is disabled
    pub gradient: Option<DVector<f64>>,
}

/// Output of one inner integration step.
#[derive(Debug, Clone)]
pub struct SimStep {
    /// Opinions after the step, clamped to `[0, 1]`
    pub state: DVector<f64>,

    /// True once the interval's inner steps are exhausted
    pub done: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objective_parse_roundtrip_names() {
        for mode in ObjectiveMode::all() {
            let parsed: ObjectiveMode = mode.name().parse().unwrap();
            assert_eq!(parsed, mode);
        }
        assert_eq!("varmin".parse::<ObjectiveMode>().unwrap(), ObjectiveMode::VarMin);
    }

    #[test]
    fn test_objective_unknown_is_error() {
        let err = "NONE".parse::<ObjectiveMode>().unwrap_err();
        assert!(matches!(err, SimError::UnknownObjective(_)));
    }

    #[test]
    fn test_differentiable_modes() {
        assert!(ObjectiveMode::Mean.is_differentiable());
        assert!(ObjectiveMode::VarMax.is_differentiable());
        assert!(!ObjectiveMode::ExtMax.is_differentiable());
        assert!(!ObjectiveMode::ExtMin.is_differentiable());
    }

    #[test]
    fn test_edge_from_tuple() {
        let edge: Edge = (1, 2).into();
        assert_eq!(edge, Edge::new(1, 2));
    }
}
