//! Expect-test harness
//!
//! Runs a source file whose assertions print their expected literal and
//! call-site, correlates that output with what the program printed in
//! between, and rewrites the literals that no longer match.

pub mod cli;
pub mod commands;
pub mod common;
pub mod harness;
pub mod patch;
pub mod protocol;
pub mod select;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use harness::{Orchestrator, RunOptions, RunOutcome};
pub use protocol::{AssertionRecord, CallSite, Instrumentation};
