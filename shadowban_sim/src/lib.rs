//! Shadow-ban Simulation Harness
//!
//! Drives [`shadowban_core::DynamicsState`] through its control loop and
//! turns the recorded histories into scored, exportable results.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   NetworkParams   ┌───────────────┐
//! │ loader /     │ ────────────────► │  SweepRunner  │  objectives × smax × sedge
//! │ scenarios    │                   └───────┬───────┘
//! └──────────────┘                           │ one DynamicsState per config
//!                                    ┌───────▼──────────┐
//!                                    │ SimulationDriver │  RESET → (CONTROL → STEP×S)×T
//!                                    └───────┬──────────┘
//!                                            │ RunResult
//!                                    ┌───────▼───────┐
//!                                    │   exporter    │  run + _allcontrols JSON
//!                                    └───────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use shadowban_sim::{ScenarioId, SimulationDriver};
//! use shadowban_core::{DynamicsState, SimParams};
//!
//! let net = ScenarioId::Triangle.build(42, 3)?;
//! let mut dynamics = DynamicsState::new(net.graph()?, net.initial_opinions()?, SimParams::default())?;
//! let result = SimulationDriver::new().run_scored(&mut dynamics)?;
//! ```

pub mod exporter;
pub mod loader;
pub mod runner;
pub mod scenarios;
pub mod sweep;

pub use exporter::{write_run, ControlsExport, RunExport};
pub use loader::load_network;
pub use runner::{time_axis, RunResult, SimulationDriver, Trajectory};
pub use scenarios::ScenarioId;
pub use sweep::{SweepOutcome, SweepRunner};
