//! Marquee Simulation - Deterministic playback simulation.
//!
//! Simulated engines and manifest loading driven by a seeded RNG, so that
//! fault handling in the playback controller can be exercised and replayed
//! without a real media stack.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use marquee_sim::{Scenario, SimulationConfig, run_scenario};
//!
//! # async fn demo() -> Result<(), marquee_sim::SimulationError> {
//! let report = run_scenario(
//!     Scenario::DecodeGlitch,
//!     SimulationConfig::with_seed(12345),
//!     Duration::from_secs(10),
//! )
//! .await?;
//! println!("{} engines created", report.backend.engines_created);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::missing_errors_doc)]

pub mod backend;
pub mod config;
pub mod invariants;
pub mod loader;
pub mod rng;
pub mod scenarios;

pub use backend::{BackendStats, SimulatedBackend};
pub use config::{ScriptedFault, SimulationConfig};
pub use invariants::{Invariant, InvariantViolation};
pub use loader::SimulatedManifestLoader;
pub use rng::DeterministicRng;
pub use scenarios::{
    KeyReplay, PlaybackSimulation, SIMULATED_SOURCE, Scenario, ScenarioReport, parse_key_script,
    replay_keys, run_scenario,
};

use marquee_core::player::SessionError;

/// Errors from running simulations.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Player error: {0}")]
    Session(#[from] SessionError),

    #[error("Unknown scenario: {name}")]
    UnknownScenario { name: String },

    #[error("Timed out waiting for {what}")]
    Timeout { what: String },
}
