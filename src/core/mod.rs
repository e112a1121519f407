//! Application core

pub mod state;

pub use state::{GenerationReport, RunError, RunOutcome, Workbench};
