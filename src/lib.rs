//! lol-ingest: a resumable ingestion engine for League of Legends data sources
//!
//! This crate pulls raw JSON payloads from the Riot match/ranked API, the
//! lolesports schedule API and the lolesports live-stats feed into an on-disk
//! archive, tracking per-pipeline progress so repeated runs only fetch what is
//! new.

pub mod api;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for ingestion runs
///
/// Only configuration problems and state-store failures abort a run; every
/// per-item failure is downgraded to a logged skip inside the crawlers.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing credential: {0} is not set")]
    MissingCredential(&'static str),
}

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use api::{ApiContext, Credentials, ErrorClass, FetchError};
pub use config::Config;
pub use crawler::{CrawlReport, ItemOutcome, Pipeline};
pub use state::{FileStateStore, SeenSet, StateStore};
pub use storage::Archive;
