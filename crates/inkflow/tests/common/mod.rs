//! Shared test utilities for inkflow integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring in-memory stores, the broadcaster and the queue
//! - `ScriptedStages`, a stage mock with call counts and failure injection
//! - Builders for brands and briefs

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{EventLog, ScriptedStages, StageCall, TestHarness};
