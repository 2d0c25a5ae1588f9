//! Shared fixtures for the integration tests

use lol_ingest::config::Config;
use lol_ingest::{ApiContext, Archive, Credentials, FileStateStore, StateStore};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary archive wired to a mock server
pub struct TestEnv {
    _temp: TempDir,
    pub config: Config,
    pub archive: Archive,
    pub store: FileStateStore,
}

impl TestEnv {
    pub fn new(server_uri: &str) -> Self {
        Self::with_config(server_uri, |_| {})
    }

    /// Builds the environment after letting the test adjust the config
    pub fn with_config(server_uri: &str, adjust: impl FnOnce(&mut Config)) -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp.path().join("data");
        let meta_dir = data_dir.join("meta");

        let mut config = Config::default();
        config.output.data_dir = data_dir.display().to_string();
        config.output.meta_dir = meta_dir.display().to_string();

        config.http.timeout_secs = 5;
        config.http.max_retries = 1;
        config.http.backoff_unit_ms = 10;

        config.riot.platform_base_url = server_uri.to_string();
        config.riot.region_base_url = server_uri.to_string();
        config.riot.account_regions = vec!["americas".to_string()];
        config.riot.seed_leagues = Vec::new();
        config.riot.requests_per_second = 1000.0;
        config.riot.burst = 1000;

        config.esports.base_url = format!("{}/persisted/gw", server_uri);
        config.esports.recent_days = None;
        config.esports.timeout_secs = 5;
        config.esports.requests_per_second = 1000.0;
        config.esports.burst = 1000;

        config.livestats.base_url = format!("{}/livestats/v1", server_uri);
        config.livestats.requests_per_second = 1000.0;
        config.livestats.burst = 1000;

        adjust(&mut config);

        Self {
            archive: Archive::new(&config.output.data_dir, &config.output.meta_dir),
            store: FileStateStore::new(&config.output.meta_dir),
            config,
            _temp: temp,
        }
    }

    /// API clients with both credentials present
    pub fn context(&self) -> ApiContext {
        ApiContext::new(
            &self.config,
            Credentials::new(
                Some("test-riot-key".to_string()),
                Some("test-esports-key".to_string()),
            ),
        )
        .expect("Failed to build API context")
    }

    pub fn data_path(&self, relative: &str) -> PathBuf {
        self.archive.data_dir().join(relative)
    }

    pub fn meta_path(&self, relative: &str) -> PathBuf {
        self.archive.meta_dir().join(relative)
    }

    /// String entries of a state document field
    pub fn state_list(&self, key: &str, field: &str) -> Vec<String> {
        let state = self.store.read_state(key).expect("Failed to read state");
        lol_ingest::state::string_list(&state, field)
    }

    pub fn write_state(&self, key: &str, document: Value) {
        self.store
            .write_state(key, document.as_object().expect("state must be an object"))
            .expect("Failed to write state");
    }

    pub fn write_json(&self, path: &Path, value: &Value) {
        lol_ingest::storage::write_json_atomic(path, value).expect("Failed to write fixture");
    }
}

pub fn read_json(path: &Path) -> Value {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    serde_json::from_str(&content).expect("Archived file is not JSON")
}
