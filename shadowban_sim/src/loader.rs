//! Network parameter files.

use shadowban_core::NetworkParams;
use shadowban_env::{SimError, SimResult};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Reads and validates a network parameter JSON file.
///
/// The file holds `num_vertices`, `edges` as `[following, follower]` pairs,
/// one rate per vertex and one initial opinion per vertex.
pub fn load_network(path: impl AsRef<Path>) -> SimResult<NetworkParams> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)?;
    let network = parse_network(&raw)?;
    debug!(
        "Loaded {} vertices, {} edges from {}",
        network.num_vertices,
        network.edges.len(),
        path.display()
    );
    Ok(network)
}

/// Parses and validates a network parameter document.
pub fn parse_network(raw: &str) -> SimResult<NetworkParams> {
    let network: NetworkParams =
        serde_json::from_str(raw).map_err(|e| SimError::Serialization(e.to_string()))?;

    network.graph()?;
    network.initial_opinions()?;
    Ok(network)
}
