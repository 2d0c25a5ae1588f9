//! Output module for run logs and progress summaries
//!
//! This module handles:
//! - The append-only per-pipeline run log of classified item failures
//! - Statistics derived from the persisted state documents

mod run_log;
pub mod stats;

pub use run_log::RunLog;
pub use stats::{load_statistics, print_statistics, PipelineStatistics};
