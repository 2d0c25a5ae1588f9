//! Append-only per-pipeline run log
//!
//! One timestamped line per item failure, tagged with its error class:
//!
//! ```text
//! [2024-05-01 12:00:00] class=UpstreamServerError event failed event_id=110 err=HTTP 503 ...
//! ```

use crate::api::{ErrorClass, FetchError};
use crate::crawler::Pipeline;
use crate::storage::StorageError;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Log for `pipeline` at `<logs_dir>/<state key>.log`
    pub fn new(logs_dir: &Path, pipeline: Pipeline) -> Self {
        Self {
            path: logs_dir.join(format!("{}.log", pipeline.state_key())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records a failed fetch for `subject` (e.g. `event_id=110`)
    pub fn fetch_failed(&self, what: &str, subject: &str, error: &FetchError) {
        self.record(
            error.class(),
            &format!("{} failed {} err={}", what, subject, error),
        );
    }

    /// Records a failed archive write for `subject`
    pub fn store_failed(&self, what: &str, subject: &str, error: &StorageError) {
        self.record(
            ErrorClass::Storage,
            &format!("{} not archived {} err={}", what, subject, error),
        );
    }

    /// Writes a classified line and mirrors it as a warning
    pub fn record(&self, class: ErrorClass, message: &str) {
        tracing::warn!("{} (class={})", message, class);
        self.append(&format!("class={} {}", class, message));
    }

    /// Marks the start of a run and the configuration it uses
    pub fn run_started(&self, config_hash: &str) {
        self.append(&format!("run started config_hash={}", config_hash));
    }

    /// Writes an unclassified informational line
    pub fn note(&self, message: &str) {
        tracing::debug!("{}", message);
        self.append(message);
    }

    fn append(&self, message: &str) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let result = self
            .path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)
            })
            .and_then(|mut file| writeln!(file, "[{}] {}", timestamp, message));

        if let Err(e) = result {
            tracing::error!("Failed to write run log {}: {}", self.path.display(), e);
        }
    }
}
