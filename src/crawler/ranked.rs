//! Ranked-ladder match crawler
//!
//! Seeds come from the apex ladders, configured summoner names, riot ids and
//! puuids. Each seed resolves to a puuid independently; the union of their
//! recent match ids is diffed against the seen set and the remainder fetched
//! over a bounded pool.

use crate::api::models::{decode, LeagueListDto, SummonerDto};
use crate::api::{ApiContext, ErrorClass, FetchError, RiotApi, RiotId};
use crate::config::RiotConfig;
use crate::crawler::{CrawlReport, ItemOutcome, Pipeline, SkipReason};
use crate::output::RunLog;
use crate::state::{fields, SeenSet, StateStore, StateUpdate};
use crate::storage::{Archive, ArchiveEntry};
use crate::{ConfigError, IngestError};
use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;

pub struct RankedCrawler<'a> {
    api: RiotApi,
    config: RiotConfig,
    store: &'a dyn StateStore,
    archive: &'a Archive,
    log: RunLog,
}

/// Result of fetching one match
struct MatchFetch {
    match_id: String,
    outcome: ItemOutcome,
}

impl<'a> RankedCrawler<'a> {
    pub fn new(
        context: &ApiContext,
        store: &'a dyn StateStore,
        archive: &'a Archive,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            api: context.riot()?,
            config: context.config().riot.clone(),
            store,
            archive,
            log: RunLog::new(&archive.logs_dir(), Pipeline::Ranked),
        })
    }

    pub async fn run(&self) -> Result<CrawlReport, IngestError> {
        let key = Pipeline::Ranked.state_key();
        let state = self.store.read_state(key)?;
        let mut seen = SeenSet::from_document(&state, fields::SEEN_MATCH_IDS);
        let mut report = CrawlReport::new(Pipeline::Ranked);

        let puuids = self.resolve_seeds().await;
        tracing::info!("Resolved {} seed players", puuids.len());

        let pending = self.discover_matches(&puuids, &seen, &mut report).await;
        tracing::info!("Fetching {} new matches", pending.len());

        let concurrency = self.config.concurrency.max(1);
        let mut results = stream::iter(pending)
            .map(|match_id| self.fetch_match(match_id))
            .buffer_unordered(concurrency);

        let mut completed = 0usize;
        while let Some(fetch) = results.next().await {
            report.record(fetch.outcome);
            if fetch.outcome == ItemOutcome::Stored {
                seen.insert(fetch.match_id.clone());
                report.new_ids.push(fetch.match_id);
            }

            completed += 1;
            if self.config.state_flush_every > 0 && completed % self.config.state_flush_every == 0
            {
                tracing::info!("Progress: {} matches processed", completed);
                self.commit(&seen)?;
            }
        }

        self.commit(&seen)?;
        Ok(report)
    }

    /// Resolves every configured seed to a puuid; failures drop only that seed
    async fn resolve_seeds(&self) -> Vec<String> {
        let platform = self.config.platform.as_str();
        let mut puuids = Vec::new();
        let mut summoner_ids = Vec::new();

        for tier in &self.config.seed_leagues {
            let ladder = match self.api.ladder(platform, *tier).await {
                Ok(ladder) => ladder,
                Err(e) => {
                    self.log
                        .fetch_failed("ladder", &format!("tier={} platform={}", tier, platform), &e);
                    continue;
                }
            };
            let entries = match decode::<LeagueListDto>(&ladder) {
                Ok(list) => list.entries,
                Err(e) => {
                    self.log.record(
                        ErrorClass::Decode,
                        &format!("ladder unreadable tier={} err={}", tier, e),
                    );
                    continue;
                }
            };
            tracing::debug!("{} ladder lists {} players", tier, entries.len());

            for entry in entries {
                match (entry.puuid, entry.summoner_id) {
                    (Some(puuid), _) => puuids.push(puuid),
                    (None, Some(summoner_id)) => summoner_ids.push(summoner_id),
                    (None, None) => {}
                }
            }
        }

        for summoner_id in &summoner_ids {
            let summoner = self.api.summoner_by_id(platform, summoner_id).await;
            if let Some(puuid) =
                self.puuid_from_summoner(summoner, &format!("summoner_id={}", summoner_id))
            {
                puuids.push(puuid);
            }
        }

        for name in &self.config.seed_summoner_names {
            let summoner = self.api.summoner_by_name(platform, name).await;
            if let Some(puuid) = self.puuid_from_summoner(summoner, &format!("name={}", name)) {
                puuids.push(puuid);
            }
        }

        for raw in &self.config.seed_riot_ids {
            let riot_id: RiotId = match raw.parse() {
                Ok(riot_id) => riot_id,
                Err(e) => {
                    tracing::warn!("Skipping seed: {}", e);
                    continue;
                }
            };
            match self
                .api
                .account_by_riot_id_in(&self.config.account_regions, &riot_id)
                .await
            {
                Ok(account) => match account.get("puuid").and_then(|p| p.as_str()) {
                    Some(puuid) => puuids.push(puuid.to_string()),
                    None => self.log.record(
                        ErrorClass::IdentityUnresolved,
                        &format!("account without puuid riot_id={}", riot_id),
                    ),
                },
                Err(e) => self
                    .log
                    .fetch_failed("account", &format!("riot_id={}", riot_id), &e),
            }
        }

        puuids.extend(self.config.seed_puuids.iter().cloned());

        let mut unique = HashSet::new();
        puuids.retain(|p| !p.is_empty() && unique.insert(p.clone()));
        puuids
    }

    fn puuid_from_summoner(
        &self,
        summoner: Result<serde_json::Value, FetchError>,
        subject: &str,
    ) -> Option<String> {
        match summoner {
            Ok(summoner) => {
                let puuid = decode::<SummonerDto>(&summoner).ok().and_then(|s| s.puuid);
                if puuid.is_none() {
                    self.log.record(
                        ErrorClass::IdentityUnresolved,
                        &format!("summoner without puuid {}", subject),
                    );
                }
                puuid
            }
            Err(e) => {
                self.log.fetch_failed("summoner", subject, &e);
                None
            }
        }
    }

    /// Recent match ids of every seed that are unseen or missing on disk
    async fn discover_matches(
        &self,
        puuids: &[String],
        seen: &SeenSet,
        report: &mut CrawlReport,
    ) -> Vec<String> {
        let region = self.config.region.as_str();
        let mut queued = HashSet::new();
        let mut pending = Vec::new();

        for puuid in puuids {
            let ids = match self
                .api
                .match_ids(region, puuid, self.config.matches_per_seed, self.config.queue)
                .await
            {
                Ok(ids) => ids,
                Err(e) => {
                    self.log
                        .fetch_failed("match ids", &format!("puuid={}", puuid), &e);
                    continue;
                }
            };

            for match_id in ids {
                if !queued.insert(match_id.clone()) {
                    continue;
                }
                let entry = ArchiveEntry::LadderMatch {
                    region,
                    match_id: &match_id,
                };
                if seen.contains(&match_id) && self.archive.exists(&entry) {
                    report.record(ItemOutcome::Skipped(SkipReason::AlreadySeen));
                } else {
                    pending.push(match_id);
                }
            }
        }

        pending
    }

    async fn fetch_match(&self, match_id: String) -> MatchFetch {
        let region = self.config.region.as_str();
        let subject = format!("match_id={}", match_id);

        let payload = match self.api.match_payload(region, &match_id).await {
            Ok(payload) => payload,
            Err(e) => {
                self.log.fetch_failed("match", &subject, &e);
                return MatchFetch {
                    outcome: ItemOutcome::Skipped(SkipReason::Failed(e.class())),
                    match_id,
                };
            }
        };

        let entry = ArchiveEntry::LadderMatch {
            region,
            match_id: &match_id,
        };
        if let Err(e) = self.archive.store(&entry, &payload) {
            self.log.store_failed("match", &subject, &e);
            return MatchFetch {
                outcome: ItemOutcome::Skipped(SkipReason::Failed(ErrorClass::Storage)),
                match_id,
            };
        }

        if self.config.fetch_timeline {
            match self.api.timeline(region, &match_id).await {
                Ok(timeline) => {
                    let entry = ArchiveEntry::LadderTimeline {
                        region,
                        match_id: &match_id,
                    };
                    if let Err(e) = self.archive.store(&entry, &timeline) {
                        self.log.store_failed("timeline", &subject, &e);
                    }
                }
                Err(e) => self.log.fetch_failed("timeline", &subject, &e),
            }
        }

        MatchFetch {
            match_id,
            outcome: ItemOutcome::Stored,
        }
    }

    fn commit(&self, seen: &SeenSet) -> Result<(), IngestError> {
        let update = StateUpdate::new()
            .seen(fields::SEEN_MATCH_IDS, seen)
            .timestamp(fields::LAST_RUN_TIME)
            .list(fields::SEED_PLAYERS, self.config.seed_summoner_names.iter().cloned())
            .list(fields::SEED_RIOT_IDS, self.config.seed_riot_ids.iter().cloned());
        self.store
            .commit(Pipeline::Ranked.state_key(), update.into_document())?;
        Ok(())
    }
}
