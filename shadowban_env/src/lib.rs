//! Shadow-ban Environment Abstraction Layer
//!
//! This crate defines the contract shared by the opinion dynamics engine and
//! the simulation harness:
//! - [`OpinionEnv`]: the reset / control-step / sim-step interface the
//!   driver runs against
//! - the vocabulary types ([`Edge`], [`ObjectiveMode`], step outputs)
//! - the [`SimError`] error type used across the workspace
//!
//! # Example
//!
//! ```ignore
//! use shadowban_env::OpinionEnv;
//!
//! fn run_interval<E: OpinionEnv>(env: &mut E, state: &DVector<f64>) -> SimResult<()> {
//!     let step = env.control_step(state)?;
//!     loop {
//!         if env.sim_step(&step.control)?.done {
//!             return Ok(());
//!         }
//!     }
//! }
//! ```

mod env;
mod error;
mod types;

pub use env::OpinionEnv;
pub use error::{SimError, SimResult};
pub use types::{ControlStep, Edge, ObjectiveMode, SimStep};
