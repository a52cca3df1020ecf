//! The five-stage content pipeline for a single job.

pub mod progress;
pub mod runner;
pub mod stage;

pub use progress::JobProgressTracker;
pub use runner::{Orchestrator, RunOutcome};
pub use stage::Stage;
