//! Configuration module for lol-ingest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use lol_ingest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ingest.toml")).unwrap();
//! println!("Matches per seed: {}", config.riot.matches_per_seed);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, EsportsConfig, HttpConfig, LiveStatsConfig, OutputConfig, RankedTier, RiotConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
