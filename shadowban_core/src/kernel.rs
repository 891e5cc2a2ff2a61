//! Influence kernels - opinion difference to influence magnitude.

use serde::{Deserialize, Serialize};
use shadowban_env::{SimError, SimResult};

/// Bounded-confidence (Hegselmann-Krause) shift.
///
/// Returns `omega * delta` when `|delta| <= tau`, otherwise `0`.
#[inline]
pub fn bounded_confidence(delta: f64, tau: f64, omega: f64) -> f64 {
    if delta.abs() <= tau {
        omega * delta
    } else {
        0.0
    }
}

/// Choice of influence kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelKind {
    /// Bounded confidence: linear pull inside the confidence radius
    #[default]
    HegselmannKrause,
}

impl KernelKind {
    /// Returns the kernel name used in result file names.
    pub fn name(&self) -> &'static str {
        match self {
            KernelKind::HegselmannKrause => "shift_HK",
        }
    }

    /// Influence magnitude for a single opinion difference.
    #[inline]
    pub fn shift(&self, delta: f64, tau: f64, omega: f64) -> f64 {
        match self {
            KernelKind::HegselmannKrause => bounded_confidence(delta, tau, omega),
        }
    }

    /// Element-wise [`shift`](Self::shift) over `deltas`, written into `out`.
    pub fn shift_into(&self, deltas: &[f64], tau: f64, omega: f64, out: &mut [f64]) -> SimResult<()> {
        if deltas.len() != out.len() {
            return Err(SimError::dimension("kernel output", deltas.len(), out.len()));
        }
        for (o, &d) in out.iter_mut().zip(deltas) {
            *o = self.shift(d, tau, omega);
        }
        Ok(())
    }
}

impl std::fmt::Display for KernelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for KernelKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shift_hk" | "hk" | "hegselmann_krause" => Ok(KernelKind::HegselmannKrause),
            _ => Err(SimError::invalid(format!("unknown kernel: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_radius_is_linear() {
        assert_eq!(bounded_confidence(0.3, 0.5, 2.0), 0.6);
        assert_eq!(bounded_confidence(-0.3, 0.5, 1.0), -0.3);
    }

    #[test]
    fn test_radius_is_inclusive() {
        assert_eq!(bounded_confidence(0.5, 0.5, 1.0), 0.5);
        assert_eq!(bounded_confidence(-0.5, 0.5, 1.0), -0.5);
    }

    #[test]
    fn test_outside_radius_is_zero() {
        assert_eq!(bounded_confidence(0.51, 0.5, 1.0), 0.0);
        assert_eq!(bounded_confidence(-0.9, 0.5, 1.0), 0.0);
    }

    #[test]
    fn test_shift_into_matches_scalar() {
        let kernel = KernelKind::HegselmannKrause;
        let deltas = [-0.7, -0.2, 0.0, 0.4, 0.6];
        let mut out = [0.0; 5];
        kernel.shift_into(&deltas, 0.5, 1.5, &mut out).unwrap();

        for (d, o) in deltas.iter().zip(out.iter()) {
            assert_eq!(*o, kernel.shift(*d, 0.5, 1.5));
        }
    }

    #[test]
    fn test_shift_into_length_mismatch() {
        let mut out = [0.0; 2];
        let err = KernelKind::HegselmannKrause
            .shift_into(&[0.1, 0.2, 0.3], 0.5, 1.0, &mut out)
            .unwrap_err();
        assert!(matches!(err, SimError::DimensionMismatch { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn test_kernel_parse() {
        assert_eq!("shift_HK".parse::<KernelKind>().unwrap(), KernelKind::HegselmannKrause);
        assert!("shift_DW".parse::<KernelKind>().is_err());
    }
}
