//! Scenario replay for the `cadence` binary.

pub mod runner;
pub mod scenario;

pub use runner::{render, Report, Runner, StepOutcome};
pub use scenario::Scenario;
