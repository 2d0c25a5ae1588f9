//! Crawlers for each ingestion pipeline
//!
//! Every crawler follows the same shape:
//! 1. Read its prior state document
//! 2. Compute the work set by diffing upstream ids against the seen sets
//! 3. Fetch each item through the shared, rate-limited fetch client
//! 4. Archive each successful payload under its natural id
//! 5. Commit progress periodically and once more at the end
//!
//! Crawlers share nothing in memory; the esports and live-stats pipelines
//! hand work to each other only through the games metadata file.

mod esports;
mod identity;
mod livestats;
mod players;
mod ranked;
mod report;

pub use esports::{is_recent, parse_start_time, EsportsCrawler, GAMES_META_FILE};
pub use identity::{platform_from_match_id, IdentityHints, IdentityLinks};
pub use livestats::LiveStatsCrawler;
pub use players::PlayerCrawler;
pub use ranked::RankedCrawler;
pub use report::{CrawlReport, ItemOutcome, SkipReason};

use crate::api::{ApiContext, ErrorClass};
use crate::output::RunLog;
use crate::state::StateStore;
use crate::storage::Archive;
use crate::{ConfigError, IngestError};
use std::fmt;

/// The independently runnable ingestion pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipeline {
    Esports,
    Ranked,
    Players,
    LiveStats,
}

impl Pipeline {
    pub const ALL: [Pipeline; 4] = [
        Pipeline::Esports,
        Pipeline::Ranked,
        Pipeline::Players,
        Pipeline::LiveStats,
    ];

    /// Key of the pipeline's state document and run log
    pub fn state_key(&self) -> &'static str {
        match self {
            Self::Esports => "esports",
            Self::Ranked => "match_v5",
            Self::Players => "lolapi",
            Self::LiveStats => "livestats",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Esports => "esports",
            Self::Ranked => "ranked",
            Self::Players => "players",
            Self::LiveStats => "livestats",
        };
        f.write_str(name)
    }
}

/// Runs a single pipeline to completion
///
/// `handed_over` is only used by the live-stats pipeline, as its game list
/// when no games metadata file exists yet.
pub async fn run_pipeline(
    pipeline: Pipeline,
    context: &ApiContext,
    store: &dyn StateStore,
    archive: &Archive,
    handed_over: &[String],
) -> Result<CrawlReport, IngestError> {
    tracing::info!("Starting {} pipeline", pipeline);

    // fatal, but still recorded next to the pipeline's other failures
    let logged = |err: ConfigError| {
        RunLog::new(&archive.logs_dir(), pipeline).record(ErrorClass::Config, &err.to_string());
        err
    };

    let report = match pipeline {
        Pipeline::Esports => {
            EsportsCrawler::new(context, store, archive)
                .map_err(logged)?
                .run()
                .await?
        }
        Pipeline::Ranked => {
            RankedCrawler::new(context, store, archive)
                .map_err(logged)?
                .run()
                .await?
        }
        Pipeline::Players => {
            PlayerCrawler::new(context, store, archive)
                .map_err(logged)?
                .run()
                .await?
        }
        Pipeline::LiveStats => {
            LiveStatsCrawler::new(context, store, archive)
                .run(handed_over)
                .await?
        }
    };

    tracing::info!("{}", report);
    Ok(report)
}

/// Runs esports, then live stats on the games it found, then players
pub async fn run_all(
    context: &ApiContext,
    store: &dyn StateStore,
    archive: &Archive,
) -> Result<Vec<CrawlReport>, IngestError> {
    let esports = run_pipeline(Pipeline::Esports, context, store, archive, &[]).await?;
    let livestats =
        run_pipeline(Pipeline::LiveStats, context, store, archive, &esports.new_ids).await?;
    let players = run_pipeline(Pipeline::Players, context, store, archive, &[]).await?;

    Ok(vec![esports, livestats, players])
}
