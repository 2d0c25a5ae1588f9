//! Riot API endpoints used by the ranked-ladder and player pipelines

use crate::api::{credential_header, endpoint, ApiRequest, FetchError, JsonFetcher};
use crate::config::RankedTier;
use crate::ConfigError;
use reqwest::header::{HeaderMap, HeaderName};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use url::Url;

const RIOT_TOKEN_HEADER: &str = "x-riot-token";
const SOLO_QUEUE: &str = "RANKED_SOLO_5x5";

/// A `gameName#tagLine` identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiotId {
    pub game_name: String,
    pub tag_line: String,
}

impl FromStr for RiotId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('#') {
            Some((name, tag)) if !name.trim().is_empty() && !tag.trim().is_empty() => Ok(Self {
                game_name: name.trim().to_string(),
                tag_line: tag.trim().to_string(),
            }),
            _ => Err(format!("Riot id must look like name#tag, got '{}'", s)),
        }
    }
}

impl fmt::Display for RiotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.game_name, self.tag_line)
    }
}

/// Client for the platform- and region-routed Riot endpoints
#[derive(Debug, Clone)]
pub struct RiotApi {
    fetcher: JsonFetcher,
    auth: HeaderMap,
    platform_base_url: String,
    region_base_url: String,
}

impl RiotApi {
    pub fn new(
        fetcher: JsonFetcher,
        api_key: &str,
        platform_base_url: &str,
        region_base_url: &str,
    ) -> Result<Self, ConfigError> {
        let mut auth = HeaderMap::new();
        auth.insert(
            HeaderName::from_static(RIOT_TOKEN_HEADER),
            credential_header(api_key, "RIOT_API_KEY")?,
        );

        Ok(Self {
            fetcher,
            auth,
            platform_base_url: platform_base_url.to_string(),
            region_base_url: region_base_url.to_string(),
        })
    }

    fn platform_url(&self, platform: &str, segments: &[&str]) -> Result<Url, FetchError> {
        endpoint(
            &self.platform_base_url.replace("{platform}", platform),
            segments,
        )
    }

    fn region_url(&self, region: &str, segments: &[&str]) -> Result<Url, FetchError> {
        endpoint(&self.region_base_url.replace("{region}", region), segments)
    }

    async fn get(&self, request: ApiRequest) -> Result<Value, FetchError> {
        self.fetcher.fetch_json(&request.headers(&self.auth)).await
    }

    /// Solo-queue ladder for an apex tier
    pub async fn ladder(&self, platform: &str, tier: RankedTier) -> Result<Value, FetchError> {
        let url = self.platform_url(
            platform,
            &["lol", "league", "v4", tier.ladder_path(), "by-queue", SOLO_QUEUE],
        )?;
        self.get(ApiRequest::new(url)).await
    }

    pub async fn summoner_by_id(&self, platform: &str, summoner_id: &str) -> Result<Value, FetchError> {
        let url = self.platform_url(platform, &["lol", "summoner", "v4", "summoners", summoner_id])?;
        self.get(ApiRequest::new(url)).await
    }

    pub async fn summoner_by_puuid(&self, platform: &str, puuid: &str) -> Result<Value, FetchError> {
        let url = self.platform_url(
            platform,
            &["lol", "summoner", "v4", "summoners", "by-puuid", puuid],
        )?;
        self.get(ApiRequest::new(url)).await
    }

    pub async fn summoner_by_name(&self, platform: &str, name: &str) -> Result<Value, FetchError> {
        let url = self.platform_url(
            platform,
            &["lol", "summoner", "v4", "summoners", "by-name", name],
        )?;
        self.get(ApiRequest::new(url)).await
    }

    pub async fn account_by_riot_id(&self, region: &str, riot_id: &RiotId) -> Result<Value, FetchError> {
        let url = self.region_url(
            region,
            &[
                "riot",
                "account",
                "v1",
                "accounts",
                "by-riot-id",
                &riot_id.game_name,
                &riot_id.tag_line,
            ],
        )?;
        self.get(ApiRequest::new(url)).await
    }

    pub async fn account_by_puuid(&self, region: &str, puuid: &str) -> Result<Value, FetchError> {
        let url = self.region_url(
            region,
            &["riot", "account", "v1", "accounts", "by-puuid", puuid],
        )?;
        self.get(ApiRequest::new(url)).await
    }

    /// Looks a riot id up in each region in turn, returning the first success
    pub async fn account_by_riot_id_in(
        &self,
        regions: &[String],
        riot_id: &RiotId,
    ) -> Result<Value, FetchError> {
        let mut last_error = None;
        for region in regions {
            match self.account_by_riot_id(region, riot_id).await {
                Ok(account) => return Ok(account),
                Err(e) => {
                    tracing::debug!("Account {} not found in {}: {}", riot_id, region, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(no_regions))
    }

    /// Looks a puuid up in each region in turn, returning the first success
    pub async fn account_by_puuid_in(
        &self,
        regions: &[String],
        puuid: &str,
    ) -> Result<Value, FetchError> {
        let mut last_error = None;
        for region in regions {
            match self.account_by_puuid(region, puuid).await {
                Ok(account) => return Ok(account),
                Err(e) => {
                    tracing::debug!("Account {} not found in {}: {}", puuid, region, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(no_regions))
    }

    pub async fn ranked_entries(&self, platform: &str, summoner_id: &str) -> Result<Value, FetchError> {
        let url = self.platform_url(
            platform,
            &["lol", "league", "v4", "entries", "by-summoner", summoner_id],
        )?;
        self.get(ApiRequest::new(url)).await
    }

    pub async fn mastery(&self, platform: &str, puuid: &str) -> Result<Value, FetchError> {
        let url = self.platform_url(
            platform,
            &["lol", "champion-mastery", "v4", "champion-masteries", "by-puuid", puuid],
        )?;
        self.get(ApiRequest::new(url)).await
    }

    pub async fn challenges(&self, platform: &str, puuid: &str) -> Result<Value, FetchError> {
        let url = self.platform_url(
            platform,
            &["lol", "challenges", "v1", "player-data", puuid],
        )?;
        self.get(ApiRequest::new(url)).await
    }

    /// Most recent match ids of a player, newest first
    pub async fn match_ids(
        &self,
        region: &str,
        puuid: &str,
        count: u32,
        queue: Option<u32>,
    ) -> Result<Vec<String>, FetchError> {
        let url = self.region_url(
            region,
            &["lol", "match", "v5", "matches", "by-puuid", puuid, "ids"],
        )?;
        let mut request = ApiRequest::new(url).query("start", 0).query("count", count);
        if let Some(queue) = queue {
            request = request.query("queue", queue);
        }

        let url = request.url().to_string();
        let value = self.get(request).await?;
        serde_json::from_value(value).map_err(|e| FetchError::Decode {
            url,
            message: e.to_string(),
        })
    }

    pub async fn match_payload(&self, region: &str, match_id: &str) -> Result<Value, FetchError> {
        let url = self.region_url(region, &["lol", "match", "v5", "matches", match_id])?;
        self.get(ApiRequest::new(url)).await
    }

    pub async fn timeline(&self, region: &str, match_id: &str) -> Result<Value, FetchError> {
        let url = self.region_url(
            region,
            &["lol", "match", "v5", "matches", match_id, "timeline"],
        )?;
        self.get(ApiRequest::new(url)).await
    }
}

fn no_regions() -> FetchError {
    FetchError::InvalidUrl {
        base: "account-regions".to_string(),
        message: "no regions configured for account lookup".to_string(),
    }
}
