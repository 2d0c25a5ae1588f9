//! lolesports live-stats feed endpoints (no credential)

use crate::api::{endpoint, ApiRequest, FetchError, JsonFetcher};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct LiveStatsApi {
    fetcher: JsonFetcher,
    base_url: String,
}

impl LiveStatsApi {
    pub fn new(fetcher: JsonFetcher, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.to_string(),
        }
    }

    /// Team-level frames for a game
    pub async fn window(&self, game_id: &str) -> Result<Value, FetchError> {
        let url = endpoint(&self.base_url, &["window", game_id])?;
        self.fetcher.fetch_json(&ApiRequest::new(url)).await
    }

    /// Participant-level frames for a game
    pub async fn details(&self, game_id: &str) -> Result<Value, FetchError> {
        let url = endpoint(&self.base_url, &["details", game_id])?;
        self.fetcher.fetch_json(&ApiRequest::new(url)).await
    }
}
