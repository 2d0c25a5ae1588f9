//! Esports schedule crawler
//!
//! League catalog → schedules → recency filter → event details → games.
//! Material games (completed or in progress) are summarised in the games
//! metadata file consumed by the live-stats pipeline.

use crate::api::models::{
    decode, EventDetailsResponse, GameMeta, LeaguesResponse, ScheduleResponse,
};
use crate::api::{ApiContext, EsportsApi, ErrorClass};
use crate::config::EsportsConfig;
use crate::crawler::{CrawlReport, ItemOutcome, Pipeline, SkipReason};
use crate::output::RunLog;
use crate::state::{fields, SeenSet, StateStore, StateUpdate};
use crate::storage::{read_json, write_json_atomic, Archive, ArchiveEntry};
use crate::{ConfigError, IngestError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::{BTreeMap, HashSet};

/// Name of the games metadata file in the meta directory
pub const GAMES_META_FILE: &str = "esports_games.json";

pub struct EsportsCrawler<'a> {
    api: EsportsApi,
    config: EsportsConfig,
    store: &'a dyn StateStore,
    archive: &'a Archive,
    log: RunLog,
}

impl<'a> EsportsCrawler<'a> {
    pub fn new(
        context: &ApiContext,
        store: &'a dyn StateStore,
        archive: &'a Archive,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            api: context.esports()?,
            config: context.config().esports.clone(),
            store,
            archive,
            log: RunLog::new(&archive.logs_dir(), Pipeline::Esports),
        })
    }

    /// Runs one crawl; `new_ids` of the report are the newly seen game ids
    pub async fn run(&self) -> Result<CrawlReport, IngestError> {
        let key = Pipeline::Esports.state_key();
        let state = self.store.read_state(key)?;
        let mut seen_events = SeenSet::from_document(&state, fields::SEEN_EVENT_IDS);
        let mut seen_games = SeenSet::from_document(&state, fields::SEEN_GAME_IDS);
        let mut report = CrawlReport::new(Pipeline::Esports);

        let league_ids = self.resolve_leagues().await;
        if league_ids.is_empty() {
            tracing::info!("No leagues to crawl");
            self.commit(&seen_events, &seen_games, true)?;
            return Ok(report);
        }

        let cutoff = self.config.recent_days.and_then(recency_cutoff);

        let event_ids = self.collect_events(&league_ids, cutoff, &mut report).await;

        let mut pending = Vec::new();
        for event_id in event_ids {
            let entry = ArchiveEntry::Event {
                event_id: &event_id,
            };
            if seen_events.contains(&event_id) && self.archive.exists(&entry) {
                report.record(ItemOutcome::Skipped(SkipReason::AlreadySeen));
            } else {
                pending.push(event_id);
            }
        }
        tracing::info!("Fetching details for {} events", pending.len());

        // games of processed events not yet merged into the metadata file
        let mut games = Vec::new();

        for (idx, event_id) in pending.iter().enumerate() {
            let outcome = self
                .process_event(
                    event_id,
                    &mut seen_events,
                    &mut seen_games,
                    &mut games,
                    &mut report.new_ids,
                )
                .await;
            report.record(outcome);

            let processed = idx + 1;
            if self.config.state_flush_every > 0 && processed % self.config.state_flush_every == 0 {
                tracing::info!("Progress: {}/{} events", processed, pending.len());
                self.flush_games_meta(&mut games)?;
                self.commit(&seen_events, &seen_games, false)?;
            }
        }

        self.flush_games_meta(&mut games)?;
        self.commit(&seen_events, &seen_games, true)?;
        Ok(report)
    }

    /// Explicit ids, else slugs resolved against the catalog, else every league
    async fn resolve_leagues(&self) -> Vec<String> {
        let catalog = match self.api.leagues().await {
            Ok(catalog) => {
                if let Err(e) = self.archive.store(&ArchiveEntry::LeagueCatalog, &catalog) {
                    self.log.store_failed("leagues", "catalog", &e);
                }
                match decode::<LeaguesResponse>(&catalog) {
                    Ok(leagues) => Some(leagues.data.leagues),
                    Err(e) => {
                        self.log
                            .record(ErrorClass::Decode, &format!("leagues unreadable err={}", e));
                        None
                    }
                }
            }
            Err(e) => {
                self.log.fetch_failed("leagues", "catalog", &e);
                None
            }
        };

        if !self.config.leagues.is_empty() {
            return self.config.leagues.clone();
        }

        let Some(leagues) = catalog else {
            return Vec::new();
        };

        if self.config.league_slugs.is_empty() {
            return leagues.into_iter().filter_map(|l| l.id).collect();
        }

        let by_slug: BTreeMap<&str, &str> = leagues
            .iter()
            .filter_map(|l| Some((l.slug.as_deref()?, l.id.as_deref()?)))
            .collect();
        self.config
            .league_slugs
            .iter()
            .filter_map(|slug| match by_slug.get(slug.as_str()) {
                Some(id) => Some(id.to_string()),
                None => {
                    tracing::warn!("League slug '{}' not found in catalog", slug);
                    None
                }
            })
            .collect()
    }

    /// Walks each league's schedule and returns unique in-window event ids
    async fn collect_events(
        &self,
        league_ids: &[String],
        cutoff: Option<DateTime<Utc>>,
        report: &mut CrawlReport,
    ) -> Vec<String> {
        let mut unique = HashSet::new();
        let mut event_ids = Vec::new();

        for league_id in league_ids {
            let mut page_token: Option<String> = None;

            for page in 0..self.config.schedule_pages.max(1) {
                let schedule = match self.api.schedule(league_id, page_token.as_deref()).await {
                    Ok(schedule) => schedule,
                    Err(e) => {
                        self.log
                            .fetch_failed("schedule", &format!("league_id={}", league_id), &e);
                        break;
                    }
                };

                let entry = ArchiveEntry::Schedule {
                    league_id,
                    page,
                };
                if let Err(e) = self.archive.store(&entry, &schedule) {
                    self.log
                        .store_failed("schedule", &format!("league_id={}", league_id), &e);
                }

                let schedule = match decode::<ScheduleResponse>(&schedule) {
                    Ok(schedule) => schedule.data.schedule,
                    Err(e) => {
                        self.log.record(
                            ErrorClass::Decode,
                            &format!("schedule unreadable league_id={} err={}", league_id, e),
                        );
                        break;
                    }
                };

                for event in &schedule.events {
                    if !is_recent(event.start_time.as_deref(), cutoff) {
                        report.record(ItemOutcome::Skipped(SkipReason::Filtered));
                        continue;
                    }
                    if let Some(id) = event.event_id() {
                        if unique.insert(id.to_string()) {
                            event_ids.push(id.to_string());
                        }
                    }
                }

                match schedule.pages.older {
                    Some(token) if !token.is_empty() => page_token = Some(token),
                    _ => break,
                }
            }
        }

        tracing::info!(
            "Found {} events across {} leagues",
            event_ids.len(),
            league_ids.len()
        );
        event_ids
    }

    async fn process_event(
        &self,
        event_id: &str,
        seen_events: &mut SeenSet,
        seen_games: &mut SeenSet,
        games: &mut Vec<GameMeta>,
        new_game_ids: &mut Vec<String>,
    ) -> ItemOutcome {
        let subject = format!("event_id={}", event_id);

        let details = match self.api.event_details(event_id).await {
            Ok(details) => details,
            Err(e) => {
                self.log.fetch_failed("event", &subject, &e);
                return ItemOutcome::Skipped(SkipReason::Failed(e.class()));
            }
        };

        if let Err(e) = self.archive.store(&ArchiveEntry::Event { event_id }, &details) {
            self.log.store_failed("event", &subject, &e);
            return ItemOutcome::Skipped(SkipReason::Failed(ErrorClass::Storage));
        }
        seen_events.insert(event_id);

        let event = match decode::<EventDetailsResponse>(&details) {
            Ok(details) => details.data.event,
            Err(e) => {
                self.log.record(
                    ErrorClass::Decode,
                    &format!("event unreadable {} err={}", subject, e),
                );
                return ItemOutcome::Stored;
            }
        };

        let league_slug = event.league_slug().unwrap_or("unknown");
        for game in event.games() {
            let (Some(game_id), Some(state)) = (game.id(), game.state) else {
                continue;
            };
            if !state.is_material() {
                continue;
            }
            if seen_games.insert(game_id) {
                new_game_ids.push(game_id.to_string());
            }
            games.push(GameMeta {
                game_id: game_id.to_string(),
                event_id: event_id.to_string(),
                league_slug: league_slug.to_string(),
                state: state.as_str().to_string(),
            });
        }

        ItemOutcome::Stored
    }

    /// Merges pending games into the metadata file, keyed by game id
    ///
    /// Runs before every state commit so an event is never marked seen
    /// without its games being listed.
    fn flush_games_meta(&self, games: &mut Vec<GameMeta>) -> Result<(), IngestError> {
        if games.is_empty() {
            return Ok(());
        }
        let games = std::mem::take(games);

        let path = self.archive.meta_path(GAMES_META_FILE);
        let previous: Vec<GameMeta> = match read_json(&path) {
            Ok(previous) => previous.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Replacing unreadable games metadata: {}", e);
                Vec::new()
            }
        };

        let merged = merge_games(previous, games);
        write_json_atomic(&path, &merged)?;
        tracing::info!("Games metadata now lists {} games", merged.len());
        Ok(())
    }

    fn commit(
        &self,
        seen_events: &SeenSet,
        seen_games: &SeenSet,
        final_commit: bool,
    ) -> Result<(), IngestError> {
        let mut update = StateUpdate::new()
            .seen(fields::SEEN_EVENT_IDS, seen_events)
            .seen(fields::SEEN_GAME_IDS, seen_games)
            .timestamp(fields::LAST_SCHEDULE_TIME);
        if final_commit {
            update = update.timestamp(fields::LAST_RUN_TIME);
        }
        self.store
            .commit(Pipeline::Esports.state_key(), update.into_document())?;
        Ok(())
    }
}

/// Previous entries keep their position; new entries replace them or append
fn merge_games(previous: Vec<GameMeta>, games: Vec<GameMeta>) -> Vec<GameMeta> {
    let mut merged = previous;
    for game in games {
        match merged.iter_mut().find(|g| g.game_id == game.game_id) {
            Some(existing) => *existing = game,
            None => merged.push(game),
        }
    }
    merged
}

/// Start of the recency window; `None` (no filtering) for zero or
/// unrepresentable windows
fn recency_cutoff(days: u32) -> Option<DateTime<Utc>> {
    if days == 0 {
        return None;
    }
    chrono::Duration::try_days(i64::from(days))
        .and_then(|window| Utc::now().checked_sub_signed(window))
}

/// Parses an ISO-8601 start time; values without an offset are taken as UTC
pub fn parse_start_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Some(time.with_timezone(&Utc));
    }
    if let Ok(time) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(time.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| time.and_utc())
}

/// An event is excluded only if a cutoff is set and its start time parses
/// to a moment before it
pub fn is_recent(start_time: Option<&str>, cutoff: Option<DateTime<Utc>>) -> bool {
    match (cutoff, start_time.and_then(parse_start_time)) {
        (Some(cutoff), Some(start)) => start >= cutoff,
        _ => true,
    }
}
