//! Error types for the shadow-ban simulation environment.

use thiserror::Error;

/// Errors that can occur while building or stepping an opinion environment.
#[derive(Debug, Error)]
pub enum SimError {
    /// The suppression LP has no feasible point: the per-edge bound cannot
    /// reach the aggregate budget.
    #[error("Infeasible control: {num_edges} edges cannot reach budget smax={smax} with per-edge bound sedge={sedge}")]
    InfeasibleControl {
        smax: f64,
        sedge: f64,
        num_edges: usize,
    },

    /// Objective mode is unknown, or unusable for the requested operation
    #[error("Unknown objective: {0}")]
    UnknownObjective(String),

    /// A vector length does not match the graph
    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A step was requested outside the control/simulation state machine
    #[error("{operation} out of sequence at interval {interval}, step {step}")]
    StepOutOfSequence {
        operation: &'static str,
        interval: usize,
        step: usize,
    },

    /// Parameter outside its admissible range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Failure inside a run, tagged with where it happened
    #[error("Run failed at interval {interval}, step {step}: {source}")]
    Run {
        interval: usize,
        step: usize,
        #[source]
        source: Box<SimError>,
    },

    /// A sweep worker task panicked or was cancelled
    #[error("Worker error: {0}")]
    Worker(String),

    /// Reading or writing a parameter/result file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parameter/result payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SimError {
    /// Creates a dimension mismatch error.
    pub fn dimension(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { what, expected, actual }
    }

    /// Creates an invalid parameter error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Wraps this error with the run position it occurred at.
    pub fn at(self, interval: usize, step: usize) -> Self {
        Self::Run {
            interval,
            step,
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping `Run` context wrappers.
    pub fn root(&self) -> &SimError {
        match self {
            Self::Run { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result alias used across the workspace.
pub type SimResult<T> = Result<T, SimError>;
