//! lolesports persisted-gateway endpoints

use crate::api::{credential_header, endpoint, ApiRequest, FetchError, JsonFetcher};
use crate::ConfigError;
use reqwest::header::{HeaderMap, HeaderName};
use serde_json::Value;

const API_KEY_HEADER: &str = "x-api-key";

/// Client for league catalog, schedules and event details
#[derive(Debug, Clone)]
pub struct EsportsApi {
    fetcher: JsonFetcher,
    auth: HeaderMap,
    base_url: String,
    hl: String,
}

impl EsportsApi {
    pub fn new(
        fetcher: JsonFetcher,
        api_key: &str,
        base_url: &str,
        hl: &str,
    ) -> Result<Self, ConfigError> {
        let mut auth = HeaderMap::new();
        auth.insert(
            HeaderName::from_static(API_KEY_HEADER),
            credential_header(api_key, "ESPORTS_API_KEY")?,
        );

        Ok(Self {
            fetcher,
            auth,
            base_url: base_url.to_string(),
            hl: hl.to_string(),
        })
    }

    fn request(&self, operation: &str) -> Result<ApiRequest, FetchError> {
        let url = endpoint(&self.base_url, &[operation])?;
        Ok(ApiRequest::new(url)
            .headers(&self.auth)
            .query("hl", &self.hl))
    }

    pub async fn leagues(&self) -> Result<Value, FetchError> {
        let request = self.request("getLeagues")?;
        self.fetcher.fetch_json(&request).await
    }

    /// One schedule page for a league; `page_token` selects an older page
    pub async fn schedule(
        &self,
        league_id: &str,
        page_token: Option<&str>,
    ) -> Result<Value, FetchError> {
        let mut request = self.request("getSchedule")?.query("leagueId", league_id);
        if let Some(token) = page_token {
            request = request.query("pageToken", token);
        }
        self.fetcher.fetch_json(&request).await
    }

    pub async fn event_details(&self, event_id: &str) -> Result<Value, FetchError> {
        let request = self.request("getEventDetails")?.query("id", event_id);
        self.fetcher.fetch_json(&request).await
    }
}
