//! Live-stats telemetry crawler
//!
//! Consumes the games metadata written by the esports crawler and archives
//! the window and details frames of every game not downloaded or skipped
//! before.

use crate::api::models::{decode, GameMeta, WindowDto};
use crate::api::{ApiContext, ErrorClass, LiveStatsApi};
use crate::config::LiveStatsConfig;
use crate::crawler::{CrawlReport, ItemOutcome, Pipeline, SkipReason, GAMES_META_FILE};
use crate::output::RunLog;
use crate::state::{fields, SeenSet, StateStore, StateUpdate};
use crate::storage::{read_json, Archive, ArchiveEntry};
use crate::IngestError;
use std::collections::HashSet;

const UNKNOWN_LEAGUE: &str = "unknown";

pub struct LiveStatsCrawler<'a> {
    api: LiveStatsApi,
    config: LiveStatsConfig,
    store: &'a dyn StateStore,
    archive: &'a Archive,
    log: RunLog,
}

/// A game to download and the league directory it is archived under
#[derive(Debug, Clone, PartialEq, Eq)]
struct GameTarget {
    game_id: String,
    league_slug: String,
}

impl<'a> LiveStatsCrawler<'a> {
    pub fn new(context: &ApiContext, store: &'a dyn StateStore, archive: &'a Archive) -> Self {
        Self {
            api: context.livestats(),
            config: context.config().livestats.clone(),
            store,
            archive,
            log: RunLog::new(&archive.logs_dir(), Pipeline::LiveStats),
        }
    }

    /// Downloads telemetry for the games in the metadata file, or for
    /// `handed_over` when there is no metadata yet
    pub async fn run(&self, handed_over: &[String]) -> Result<CrawlReport, IngestError> {
        let key = Pipeline::LiveStats.state_key();
        let state = self.store.read_state(key)?;
        let mut downloaded = SeenSet::from_document(&state, fields::DOWNLOADED_GAME_IDS);
        let mut skipped = SeenSet::from_document(&state, fields::SKIPPED_GAME_IDS);
        let mut report = CrawlReport::new(Pipeline::LiveStats);

        let targets = self.targets(handed_over);
        tracing::info!("{} candidate games for live stats", targets.len());

        for target in &targets {
            if downloaded.contains(&target.game_id) || skipped.contains(&target.game_id) {
                report.record(ItemOutcome::Skipped(SkipReason::AlreadySeen));
                continue;
            }

            let outcome = self.download(target).await;
            match outcome {
                ItemOutcome::Stored => {
                    downloaded.insert(target.game_id.clone());
                    report.new_ids.push(target.game_id.clone());
                }
                ItemOutcome::Skipped(SkipReason::Empty) => {
                    skipped.insert(target.game_id.clone());
                }
                _ => {}
            }
            report.record(outcome);
        }

        let update = StateUpdate::new()
            .seen(fields::DOWNLOADED_GAME_IDS, &downloaded)
            .seen(fields::SKIPPED_GAME_IDS, &skipped)
            .timestamp(fields::LAST_RUN_TIME);
        self.store.commit(key, update.into_document())?;

        Ok(report)
    }

    fn targets(&self, handed_over: &[String]) -> Vec<GameTarget> {
        let path = self.archive.meta_path(GAMES_META_FILE);
        let games: Vec<GameMeta> = match read_json(&path) {
            Ok(games) => games.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Ignoring unreadable games metadata: {}", e);
                Vec::new()
            }
        };

        let candidates: Vec<GameTarget> = if games.is_empty() {
            handed_over
                .iter()
                .map(|game_id| GameTarget {
                    game_id: game_id.clone(),
                    league_slug: UNKNOWN_LEAGUE.to_string(),
                })
                .collect()
        } else {
            games
                .into_iter()
                .filter(|g| {
                    self.config.league_slugs.is_empty()
                        || self.config.league_slugs.contains(&g.league_slug)
                })
                .map(|g| GameTarget {
                    league_slug: if g.league_slug.is_empty() {
                        UNKNOWN_LEAGUE.to_string()
                    } else {
                        g.league_slug
                    },
                    game_id: g.game_id,
                })
                .collect()
        };

        let mut unique = HashSet::new();
        candidates
            .into_iter()
            .filter(|t| !t.game_id.is_empty() && unique.insert(t.game_id.clone()))
            .collect()
    }

    async fn download(&self, target: &GameTarget) -> ItemOutcome {
        let game_id = target.game_id.as_str();
        let league_slug = target.league_slug.as_str();
        let subject = format!("game_id={}", game_id);

        let window = match self.api.window(game_id).await {
            Ok(window) => window,
            Err(e) => {
                self.log.fetch_failed("livestats window", &subject, &e);
                return ItemOutcome::Skipped(SkipReason::Failed(e.class()));
            }
        };

        // an unreadable window is archived rather than skipped for good
        let has_data = decode::<WindowDto>(&window)
            .map(|w| w.has_data())
            .unwrap_or(true);
        if self.config.skip_empty && !has_data {
            self.log.note(&format!("livestats empty window {}", subject));
            return ItemOutcome::Skipped(SkipReason::Empty);
        }

        let details = match self.api.details(game_id).await {
            Ok(details) => details,
            Err(e) => {
                self.log.fetch_failed("livestats details", &subject, &e);
                return ItemOutcome::Skipped(SkipReason::Failed(e.class()));
            }
        };

        let stored = self
            .archive
            .store(
                &ArchiveEntry::LiveStatsWindow {
                    league_slug,
                    game_id,
                },
                &window,
            )
            .and_then(|_| {
                self.archive.store(
                    &ArchiveEntry::LiveStatsDetails {
                        league_slug,
                        game_id,
                    },
                    &details,
                )
            });
        if let Err(e) = stored {
            self.log.store_failed("livestats", &subject, &e);
            return ItemOutcome::Skipped(SkipReason::Failed(ErrorClass::Storage));
        }

        ItemOutcome::Stored
    }
}
