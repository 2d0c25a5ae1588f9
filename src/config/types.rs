use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Main configuration structure for lol-ingest
///
/// Every section is optional; missing sections and keys fall back to the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub http: HttpConfig,
    pub riot: RiotConfig,
    pub esports: EsportsConfig,
    pub livestats: LiveStatsConfig,
}

/// Where the archive, state documents and logs live
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root of the raw archive and the logs directory
    #[serde(rename = "data-dir")]
    pub data_dir: String,

    /// Directory holding per-pipeline state documents and metadata files
    #[serde(rename = "meta-dir")]
    pub meta_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            meta_dir: "data/meta".to_string(),
        }
    }
}

/// Retry and transport policy shared by every vendor client
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// TCP connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Retries for 5xx and transport failures (429 waits are not counted)
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Exponential backoff base: delay = unit * base^attempt
    #[serde(rename = "backoff-base")]
    pub backoff_base: f64,

    /// Backoff unit (milliseconds)
    #[serde(rename = "backoff-unit-ms")]
    pub backoff_unit_ms: u64,

    /// Wait used when a 429 carries no usable Retry-After header (seconds)
    #[serde(rename = "default-retry-after-secs")]
    pub default_retry_after_secs: u64,

    /// Maximum number of 429 waits for a single request
    #[serde(rename = "max-rate-limit-waits")]
    pub max_rate_limit_waits: u32,

    /// Longest single 429 wait; larger Retry-After hints are clamped (seconds)
    #[serde(rename = "max-retry-after-secs")]
    pub max_retry_after_secs: u64,

    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            connect_timeout_secs: 10,
            max_retries: 3,
            backoff_base: 2.0,
            backoff_unit_ms: 1000,
            default_retry_after_secs: 1,
            max_rate_limit_waits: 30,
            max_retry_after_secs: 300,
            user_agent: format!("lol-ingest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Riot API configuration (ranked-ladder and player pipelines)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiotConfig {
    /// Default platform shard (e.g. "na1", "kr")
    pub platform: String,

    /// Routing region for account and match endpoints (e.g. "americas")
    pub region: String,

    /// Optional queue filter for match id listings
    pub queue: Option<u32>,

    #[serde(rename = "seed-summoner-names")]
    pub seed_summoner_names: Vec<String>,

    #[serde(rename = "seed-summoner-ids")]
    pub seed_summoner_ids: Vec<String>,

    #[serde(rename = "seed-riot-ids")]
    pub seed_riot_ids: Vec<String>,

    #[serde(rename = "seed-puuids")]
    pub seed_puuids: Vec<String>,

    #[serde(rename = "seed-leagues")]
    pub seed_leagues: Vec<RankedTier>,

    /// Number of recent match ids requested per player
    #[serde(rename = "matches-per-seed")]
    pub matches_per_seed: u32,

    #[serde(rename = "fetch-timeline")]
    pub fetch_timeline: bool,

    /// Regions tried in order for account lookups
    #[serde(rename = "account-regions")]
    pub account_regions: Vec<String>,

    /// Sustained request rate allowed against the Riot API
    #[serde(rename = "requests-per-second")]
    pub requests_per_second: f64,

    /// Token bucket capacity
    pub burst: u32,

    /// Parallel match fetches in the ranked-ladder crawler
    pub concurrency: usize,

    /// Commit state every N processed matches
    #[serde(rename = "state-flush-every")]
    pub state_flush_every: usize,

    /// Host template for platform-scoped endpoints; `{platform}` is substituted
    #[serde(rename = "platform-base-url")]
    pub platform_base_url: String,

    /// Host template for region-scoped endpoints; `{region}` is substituted
    #[serde(rename = "region-base-url")]
    pub region_base_url: String,
}

impl Default for RiotConfig {
    fn default() -> Self {
        Self {
            platform: "na1".to_string(),
            region: "americas".to_string(),
            queue: None,
            seed_summoner_names: Vec::new(),
            seed_summoner_ids: Vec::new(),
            seed_riot_ids: Vec::new(),
            seed_puuids: Vec::new(),
            seed_leagues: vec![
                RankedTier::Challenger,
                RankedTier::Grandmaster,
                RankedTier::Master,
            ],
            matches_per_seed: 10,
            fetch_timeline: false,
            account_regions: vec![
                "americas".to_string(),
                "europe".to_string(),
                "asia".to_string(),
            ],
            requests_per_second: 0.8,
            burst: 20,
            concurrency: 4,
            state_flush_every: 50,
            platform_base_url: "https://{platform}.api.riotgames.com".to_string(),
            region_base_url: "https://{region}.api.riotgames.com".to_string(),
        }
    }
}

/// lolesports schedule API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EsportsConfig {
    /// Explicit league ids; take precedence over slugs
    pub leagues: Vec<String>,

    #[serde(rename = "league-slugs")]
    pub league_slugs: Vec<String>,

    /// Locale passed as `hl`
    pub hl: String,

    /// Skip events that started more than this many days ago
    #[serde(rename = "recent-days")]
    pub recent_days: Option<u32>,

    /// Commit state every N processed events (0 disables partial flushes)
    #[serde(rename = "state-flush-every")]
    pub state_flush_every: usize,

    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Number of schedule pages to walk per league (newest first)
    #[serde(rename = "schedule-pages")]
    pub schedule_pages: u32,

    #[serde(rename = "requests-per-second")]
    pub requests_per_second: f64,

    pub burst: u32,

    #[serde(rename = "base-url")]
    pub base_url: String,
}

impl Default for EsportsConfig {
    fn default() -> Self {
        Self {
            leagues: Vec::new(),
            league_slugs: Vec::new(),
            hl: "en-US".to_string(),
            recent_days: Some(90),
            state_flush_every: 50,
            timeout_secs: 40,
            schedule_pages: 1,
            requests_per_second: 5.0,
            burst: 10,
            base_url: "https://esports-api.lolesports.com/persisted/gw".to_string(),
        }
    }
}

/// lolesports live-stats feed configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LiveStatsConfig {
    /// Restrict downloads to these league slugs (empty = all)
    #[serde(rename = "league-slugs")]
    pub league_slugs: Vec<String>,

    /// Record games whose window has no gold/kill data as skipped
    #[serde(rename = "skip-empty")]
    pub skip_empty: bool,

    #[serde(rename = "requests-per-second")]
    pub requests_per_second: f64,

    pub burst: u32,

    #[serde(rename = "base-url")]
    pub base_url: String,
}

impl Default for LiveStatsConfig {
    fn default() -> Self {
        Self {
            league_slugs: Vec::new(),
            skip_empty: true,
            requests_per_second: 5.0,
            burst: 10,
            base_url: "https://feed.lolesports.com/livestats/v1".to_string(),
        }
    }
}

/// Apex ranked tiers whose ladders can seed the match crawler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankedTier {
    Challenger,
    Grandmaster,
    Master,
}

impl RankedTier {
    /// Path of the solo-queue ladder endpoint for this tier
    pub fn ladder_path(&self) -> &'static str {
        match self {
            Self::Challenger => "challengerleagues",
            Self::Grandmaster => "grandmasterleagues",
            Self::Master => "masterleagues",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Challenger => "challenger",
            Self::Grandmaster => "grandmaster",
            Self::Master => "master",
        }
    }
}

impl fmt::Display for RankedTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankedTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "challenger" => Ok(Self::Challenger),
            "grandmaster" => Ok(Self::Grandmaster),
            "master" => Ok(Self::Master),
            other => Err(format!("Unknown league tier: {}", other)),
        }
    }
}
