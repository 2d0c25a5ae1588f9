//! Upstream API clients
//!
//! This module contains everything that talks to the network:
//! - The retrying JSON fetcher and its retry policy
//! - Per-vendor token-bucket limiters
//! - Typed endpoint wrappers for the Riot API, the lolesports schedule API
//!   and the lolesports live-stats feed
//! - Typed views over the payloads those endpoints return
//!
//! `ApiContext` is built once at startup from the configuration and the
//! credentials; crawlers receive their vendor client from it and never read
//! the environment themselves.

mod error;
mod esports;
mod fetcher;
mod limiter;
mod livestats;
pub mod models;
mod riot;

pub use error::{ErrorClass, FetchError};
pub use esports::EsportsApi;
pub use fetcher::{build_http_client, retry_after, ApiRequest, JsonFetcher, RetryPolicy};
pub use limiter::VendorLimiter;
pub use livestats::LiveStatsApi;
pub use riot::{RiotApi, RiotId};

use crate::config::Config;
use crate::{ConfigError, IngestError};
use reqwest::header::HeaderValue;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Vendor credentials, read once at startup
#[derive(Clone, Default)]
pub struct Credentials {
    riot_api_key: Option<String>,
    esports_api_key: Option<String>,
}

impl Credentials {
    pub const RIOT_ENV: &'static str = "RIOT_API_KEY";
    pub const ESPORTS_ENV: &'static str = "ESPORTS_API_KEY";

    pub fn new(riot_api_key: Option<String>, esports_api_key: Option<String>) -> Self {
        Self {
            riot_api_key: riot_api_key.filter(|k| !k.trim().is_empty()),
            esports_api_key: esports_api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Reads `RIOT_API_KEY` and `ESPORTS_API_KEY`; empty values count as unset
    pub fn from_env() -> Self {
        Self::new(
            std::env::var(Self::RIOT_ENV).ok(),
            std::env::var(Self::ESPORTS_ENV).ok(),
        )
    }

    pub fn riot(&self) -> Result<&str, ConfigError> {
        self.riot_api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential(Self::RIOT_ENV))
    }

    pub fn esports(&self) -> Result<&str, ConfigError> {
        self.esports_api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential(Self::ESPORTS_ENV))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("riot_api_key", &self.riot_api_key.as_ref().map(|_| "<set>"))
            .field(
                "esports_api_key",
                &self.esports_api_key.as_ref().map(|_| "<set>"),
            )
            .finish()
    }
}

/// Immutable client configuration shared by every crawler
#[derive(Debug)]
pub struct ApiContext {
    config: Config,
    credentials: Credentials,
    client: Client,
    riot_limiter: Arc<VendorLimiter>,
    esports_limiter: Arc<VendorLimiter>,
    livestats_limiter: Arc<VendorLimiter>,
}

impl ApiContext {
    pub fn new(config: &Config, credentials: Credentials) -> Result<Self, IngestError> {
        let client = build_http_client(&config.http)?;

        Ok(Self {
            riot_limiter: Arc::new(VendorLimiter::new(
                "riot",
                config.riot.requests_per_second,
                config.riot.burst,
            )),
            esports_limiter: Arc::new(VendorLimiter::new(
                "esports",
                config.esports.requests_per_second,
                config.esports.burst,
            )),
            livestats_limiter: Arc::new(VendorLimiter::new(
                "livestats",
                config.livestats.requests_per_second,
                config.livestats.burst,
            )),
            config: config.clone(),
            credentials,
            client,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn fetcher(&self, limiter: &Arc<VendorLimiter>) -> JsonFetcher {
        JsonFetcher::new(self.client.clone(), RetryPolicy::from_config(&self.config.http))
            .with_limiter(Arc::clone(limiter))
    }

    /// Riot API client; fails if `RIOT_API_KEY` is missing
    pub fn riot(&self) -> Result<RiotApi, ConfigError> {
        let key = self.credentials.riot()?;
        RiotApi::new(
            self.fetcher(&self.riot_limiter),
            key,
            &self.config.riot.platform_base_url,
            &self.config.riot.region_base_url,
        )
    }

    /// lolesports schedule client; fails if `ESPORTS_API_KEY` is missing
    pub fn esports(&self) -> Result<EsportsApi, ConfigError> {
        let key = self.credentials.esports()?;
        let esports = &self.config.esports;
        let fetcher = JsonFetcher::new(
            self.client.clone(),
            RetryPolicy::from_config(&self.config.http)
                .with_timeout(Duration::from_secs(esports.timeout_secs)),
        )
        .with_limiter(Arc::clone(&self.esports_limiter));
        EsportsApi::new(fetcher, key, &esports.base_url, &esports.hl)
    }

    /// Live-stats feed client (no credential required)
    pub fn livestats(&self) -> LiveStatsApi {
        LiveStatsApi::new(
            self.fetcher(&self.livestats_limiter),
            &self.config.livestats.base_url,
        )
    }
}

/// Appends path segments (percent-encoded) to a base URL
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, FetchError> {
    let invalid = |message: String| FetchError::InvalidUrl {
        base: base.to_string(),
        message,
    };

    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| invalid("URL cannot be a base".to_string()))?;
        path.pop_if_empty().extend(segments);
    }
    Ok(url)
}

/// Builds a header value from a credential
pub(crate) fn credential_header(value: &str, name: &'static str) -> Result<HeaderValue, ConfigError> {
    let mut header = HeaderValue::from_str(value.trim()).map_err(|_| {
        ConfigError::Validation(format!("{} contains characters not allowed in a header", name))
    })?;
    header.set_sensitive(true);
    Ok(header)
}
