//! Synthetic networks for runs without a parameter file.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal, Uniform};
use shadowban_core::NetworkParams;
use shadowban_env::{SimError, SimResult};

/// Mean follow probability of the random graphs, as expected out-degree.
const EXPECTED_DEGREE: f64 = 4.0;

/// Community centers of the polarized network.
const POLE_LOW: f64 = 0.2;
const POLE_HIGH: f64 = 0.8;
const POLE_SPREAD: f64 = 0.08;

/// Chance that a cross-community pair is linked, relative to an in-community pair.
const CROSS_LINK_RATIO: f64 = 0.1;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Three vertices, `0 <-> 1 -> 2`, unit rates
    Triangle,

    /// Bidirectional ring with uniform opinions
    Ring,

    /// Directed G(n, p) graph with uniform opinions
    ErdosRenyi,

    /// Two opinion communities with sparse cross links
    Polarized,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Triangle,
            ScenarioId::Ring,
            ScenarioId::ErdosRenyi,
            ScenarioId::Polarized,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Triangle => "triangle",
            ScenarioId::Ring => "ring",
            ScenarioId::ErdosRenyi => "erdos_renyi",
            ScenarioId::Polarized => "polarized",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Triangle => "3 vertices, opinions 0.2/0.5/0.8, edges 0->1, 1->0, 1->2",
            ScenarioId::Ring => "n-vertex ring, each vertex follows both neighbours",
            ScenarioId::ErdosRenyi => "random directed graph, expected degree 4",
            ScenarioId::Polarized => "two communities near 0.2 and 0.8, sparse cross links",
        }
    }

    /// Builds the network for this scenario.
    ///
    /// `num_vertices` is ignored by the fixed-size triangle. Same seed, same
    /// network.
    pub fn build(&self, seed: u64, num_vertices: usize) -> SimResult<NetworkParams> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        match self {
            ScenarioId::Triangle => Ok(NetworkParams {
                num_vertices: 3,
                edges: vec![(0, 1), (1, 0), (1, 2)],
                rates: vec![1.0; 3],
                opinions0: vec![0.2, 0.5, 0.8],
            }),
            ScenarioId::Ring => {
                let n = require_vertices(num_vertices, 3)?;
                let edges = (0..n)
                    .flat_map(|i| [(i, (i + 1) % n), ((i + 1) % n, i)])
                    .collect();
                Ok(NetworkParams {
                    num_vertices: n,
                    edges,
                    rates: random_rates(&mut rng, n),
                    opinions0: uniform_opinions(&mut rng, n),
                })
            }
            ScenarioId::ErdosRenyi => {
                let n = require_vertices(num_vertices, 2)?;
                let p = (EXPECTED_DEGREE / (n - 1) as f64).min(1.0);
                let mut edges = Vec::new();
                for source in 0..n {
                    for target in 0..n {
                        if source != target && rng.gen_bool(p) {
                            edges.push((source, target));
                        }
                    }
                }
                Ok(NetworkParams {
                    num_vertices: n,
                    edges,
                    rates: random_rates(&mut rng, n),
                    opinions0: uniform_opinions(&mut rng, n),
                })
            }
            ScenarioId::Polarized => {
                let n = require_vertices(num_vertices, 4)?;
                let half = n / 2;
                let low = Normal::new(POLE_LOW, POLE_SPREAD)
                    .map_err(|e| SimError::invalid(e.to_string()))?;
                let high = Normal::new(POLE_HIGH, POLE_SPREAD)
                    .map_err(|e| SimError::invalid(e.to_string()))?;
                let opinions0 = (0..n)
                    .map(|v| {
                        let pole = if v < half { &low } else { &high };
                        pole.sample(&mut rng).clamp(0.0, 1.0)
                    })
                    .collect();

                let p_in = (EXPECTED_DEGREE / half.max(2) as f64).min(1.0);
                let p_cross = p_in * CROSS_LINK_RATIO;
                let mut edges = Vec::new();
                for source in 0..n {
                    for target in 0..n {
                        if source == target {
                            continue;
                        }
                        let same = (source < half) == (target < half);
                        if rng.gen_bool(if same { p_in } else { p_cross }) {
                            edges.push((source, target));
                        }
                    }
                }
                Ok(NetworkParams {
                    num_vertices: n,
                    edges,
                    rates: random_rates(&mut rng, n),
                    opinions0,
                })
            }
        }
    }
}

fn require_vertices(requested: usize, minimum: usize) -> SimResult<usize> {
    if requested < minimum {
        return Err(SimError::invalid(format!(
            "scenario needs at least {} vertices, got {}",
            minimum, requested
        )));
    }
    Ok(requested)
}

fn random_rates(rng: &mut ChaCha8Rng, n: usize) -> Vec<f64> {
    let dist = Uniform::new_inclusive(0.5, 1.5);
    (0..n).map(|_| dist.sample(rng)).collect()
}

fn uniform_opinions(rng: &mut ChaCha8Rng, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.gen_range(0.0..=1.0)).collect()
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "triangle" => Ok(ScenarioId::Triangle),
            "ring" | "cycle" => Ok(ScenarioId::Ring),
            "erdos_renyi" | "erdosrenyi" | "er" | "random" => Ok(ScenarioId::ErdosRenyi),
            "polarized" | "polarised" => Ok(ScenarioId::Polarized),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
