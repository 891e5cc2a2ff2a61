//! Influence graph - directed edge list plus per-vertex rates.

use nalgebra::DVector;
use shadowban_env::{Edge, SimError, SimResult};

/// A fixed directed multigraph.
///
/// Edge `e` carries influence from `edges[e].source` (the followed account)
/// to `edges[e].target` (the follower). Immutable once built.
#[derive(Debug, Clone)]
pub struct InfluenceGraph {
    num_vertices: usize,
    edges: Vec<Edge>,
    rates: DVector<f64>,
}

impl InfluenceGraph {
    /// Builds a graph, checking every endpoint and the rate vector.
    pub fn new(num_vertices: usize, edges: Vec<Edge>, rates: DVector<f64>) -> SimResult<Self> {
        if num_vertices == 0 {
            return Err(SimError::invalid("graph needs at least one vertex"));
        }
        if rates.len() != num_vertices {
            return Err(SimError::dimension("rates", num_vertices, rates.len()));
        }
        if let Some(bad) = edges
            .iter()
            .find(|e| e.source >= num_vertices || e.target >= num_vertices)
        {
            return Err(SimError::invalid(format!(
                "edge ({}, {}) references a vertex outside 0..{}",
                bad.source, bad.target, num_vertices
            )));
        }
        if rates.iter().any(|r| !r.is_finite()) {
            return Err(SimError::invalid("rates must be finite"));
        }

        Ok(Self {
            num_vertices,
            edges,
            rates,
        })
    }

    /// Builds a graph where every vertex has the same rate.
    pub fn with_uniform_rate(num_vertices: usize, edges: Vec<Edge>, rate: f64) -> SimResult<Self> {
        Self::new(num_vertices, edges, DVector::from_element(num_vertices, rate))
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn rates(&self) -> &DVector<f64> {
        &self.rates
    }
}
