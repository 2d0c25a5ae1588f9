//! Player ingestion crawler
//!
//! Each seed player (riot id or puuid) expands to account, summoner, mastery,
//! challenges, recent matches and ranked entries. Ranked entries need a
//! summoner id; when the summoner-by-puuid record has none, the fallback
//! ladder tries summoner-by-name with every known display name and finally
//! the summoner id from the player's own match participant entry.

use crate::api::models::{decode, AccountDto, MatchDto, SummonerDto};
use crate::api::{ApiContext, ErrorClass, RiotApi, RiotId};
use crate::config::RiotConfig;
use crate::crawler::identity::{platform_from_match_id, IdentityHints, IdentityLinks};
use crate::crawler::{CrawlReport, ItemOutcome, Pipeline, SkipReason};
use crate::output::RunLog;
use crate::state::{fields, string_list, SeenSet, StateStore, StateUpdate};
use crate::storage::{Archive, ArchiveEntry, PlayerPayload};
use crate::{ConfigError, IngestError};
use serde_json::Value;
use std::collections::HashSet;

pub struct PlayerCrawler<'a> {
    api: RiotApi,
    config: RiotConfig,
    store: &'a dyn StateStore,
    archive: &'a Archive,
    log: RunLog,
}

/// Mutable progress of one run
struct PlayerRun {
    seen: SeenSet,
    links: IdentityLinks,
    riot_ids: Vec<String>,
    puuids: Vec<String>,
    summoner_ids: Vec<String>,
    ranked_done: HashSet<String>,
    report: CrawlReport,
}

impl PlayerRun {
    fn add_summoner_id(&mut self, summoner_id: &str) {
        if !self.summoner_ids.iter().any(|s| s == summoner_id) {
            self.summoner_ids.push(summoner_id.to_string());
        }
    }
}

impl<'a> PlayerCrawler<'a> {
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
            log: RunLog::new(&archive.logs_dir(), Pipeline::Players),
        })
    }

    pub async fn run(&self) -> Result<CrawlReport, IngestError> {
        let state = self.store.read_state(Pipeline::Players.state_key())?;

        // seeds from earlier runs stay active
        let mut run = PlayerRun {
            seen: SeenSet::from_document(&state, fields::SEEN_MATCH_IDS),
            links: IdentityLinks::new(),
            riot_ids: union(&self.config.seed_riot_ids, string_list(&state, fields::SEED_RIOT_IDS)),
            puuids: union(&self.config.seed_puuids, string_list(&state, fields::SEED_PUUIDS)),
            summoner_ids: union(
                &self.config.seed_summoner_ids,
                string_list(&state, fields::SEED_SUMMONER_IDS),
            ),
            ranked_done: HashSet::new(),
            report: CrawlReport::new(Pipeline::Players),
        };

        let players = self.resolve_players(&run).await;
        let total = players.len();
        tracing::info!("Ingesting {} players", total);

        for (idx, (puuid, account)) in players.into_iter().enumerate() {
            tracing::info!("Player {}/{}: {}", idx + 1, total, puuid);
            self.ingest_player(&puuid, account, &mut run).await;
            self.commit(&run)?;
        }

        let remaining: Vec<String> = run
            .summoner_ids
            .iter()
            .filter(|s| !run.ranked_done.contains(*s))
            .cloned()
            .collect();
        for summoner_id in remaining {
            self.fetch_ranked(&summoner_id, &mut run).await;
        }

        self.commit(&run)?;
        Ok(run.report)
    }

    /// Riot ids resolve to (puuid, account); puuid seeds follow, deduplicated
    async fn resolve_players(&self, run: &PlayerRun) -> Vec<(String, Option<Value>)> {
        let mut players: Vec<(String, Option<Value>)> = Vec::new();

        for raw in &run.riot_ids {
            let riot_id: RiotId = match raw.parse() {
                Ok(riot_id) => riot_id,
                Err(e) => {
                    tracing::warn!("Skipping seed: {}", e);
                    continue;
                }
            };

            let account = match self
                .api
                .account_by_riot_id_in(&self.config.account_regions, &riot_id)
                .await
            {
                Ok(account) => account,
                Err(e) => {
                    self.log
                        .fetch_failed("account", &format!("riot_id={}", riot_id), &e);
                    continue;
                }
            };

            let Some(puuid) = decode::<AccountDto>(&account).ok().and_then(|a| a.puuid) else {
                self.log.record(
                    ErrorClass::IdentityUnresolved,
                    &format!("account without puuid riot_id={}", riot_id),
                );
                continue;
            };
            if !players.iter().any(|(p, _)| *p == puuid) {
                players.push((puuid, Some(account)));
            }
        }

        for puuid in &run.puuids {
            if !puuid.is_empty() && !players.iter().any(|(p, _)| p == puuid) {
                players.push((puuid.clone(), None));
            }
        }

        players
    }

    async fn ingest_player(&self, puuid: &str, account: Option<Value>, run: &mut PlayerRun) {
        let platform = self.config.platform.as_str();
        let mut hints = IdentityHints::default();

        let account = match account {
            Some(account) => Some(account),
            None => match self
                .api
                .account_by_puuid_in(&self.config.account_regions, puuid)
                .await
            {
                Ok(account) => Some(account),
                Err(e) => {
                    self.log
                        .fetch_failed("account", &format!("puuid={}", puuid), &e);
                    None
                }
            },
        };
        if let Some(account) = account {
            self.store_player(puuid, PlayerPayload::Account, &account);
            hints.account_name = decode::<AccountDto>(&account)
                .ok()
                .and_then(|a| a.game_name)
                .filter(|n| !n.is_empty());
        }

        let mut summoner_id = self.summoner_by_puuid(puuid, &mut hints).await;

        match self.api.mastery(platform, puuid).await {
            Ok(mastery) => self.store_player(puuid, PlayerPayload::Mastery, &mastery),
            Err(e) => self
                .log
                .fetch_failed("mastery", &format!("puuid={}", puuid), &e),
        }

        match self.api.challenges(platform, puuid).await {
            Ok(challenges) => self.store_player(puuid, PlayerPayload::Challenges, &challenges),
            Err(e) => self
                .log
                .fetch_failed("challenges", &format!("puuid={}", puuid), &e),
        }

        self.ingest_matches(puuid, &mut hints, run).await;

        if summoner_id.is_none() {
            summoner_id = self.fallback_summoner_id(puuid, &hints).await;
        }

        match summoner_id {
            Some(summoner_id) => {
                run.links
                    .link(puuid, &summoner_id, hints.platform.as_deref());
                run.add_summoner_id(&summoner_id);
                self.fetch_ranked(&summoner_id, run).await;
            }
            None => self.log.record(
                ErrorClass::IdentityUnresolved,
                &format!("no summoner id puuid={} platform={}", puuid, platform),
            ),
        }
    }

    /// The primary lookup; also records the summoner's display name as a hint
    async fn summoner_by_puuid(&self, puuid: &str, hints: &mut IdentityHints) -> Option<String> {
        let platform = self.config.platform.as_str();

        let summoner = match self.api.summoner_by_puuid(platform, puuid).await {
            Ok(summoner) => summoner,
            Err(e) => {
                self.log
                    .fetch_failed("summoner by puuid", &format!("puuid={}", puuid), &e);
                return None;
            }
        };
        self.store_player(puuid, PlayerPayload::Summoner, &summoner);

        let dto = decode::<SummonerDto>(&summoner).unwrap_or_default();
        hints.summoner_name = dto.name.filter(|n| !n.is_empty());

        let summoner_id = dto.id.filter(|id| !id.is_empty());
        if summoner_id.is_none() {
            self.log.record(
                ErrorClass::IdentityUnresolved,
                &format!(
                    "summoner by puuid missing id puuid={} platform={} keys={:?}",
                    puuid,
                    platform,
                    response_keys(&summoner)
                ),
            );
        }
        summoner_id
    }

    /// Fetches recent matches and collects identity hints from all of them,
    /// including those archived by earlier runs
    async fn ingest_matches(&self, puuid: &str, hints: &mut IdentityHints, run: &mut PlayerRun) {
        let region = self.config.region.as_str();

        let match_ids = match self
            .api
            .match_ids(region, puuid, self.config.matches_per_seed, self.config.queue)
            .await
        {
            Ok(ids) => ids,
            Err(e) => {
                self.log
                    .fetch_failed("match ids", &format!("puuid={}", puuid), &e);
                return;
            }
        };
        if hints.platform.is_none() {
            hints.platform = match_ids.first().and_then(|id| platform_from_match_id(id));
        }

        for match_id in match_ids {
            let entry = ArchiveEntry::PlayerMatch {
                region,
                match_id: &match_id,
            };

            if run.seen.contains(&match_id) && self.archive.exists(&entry) {
                match self.archive.load(&entry) {
                    Ok(Some(payload)) => {
                        if let Ok(payload) = decode::<MatchDto>(&payload) {
                            hints.observe_match(puuid, &match_id, &payload);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::debug!("Cannot reread {}: {}", match_id, e),
                }
                run.report
                    .record(ItemOutcome::Skipped(SkipReason::AlreadySeen));
                continue;
            }

            let outcome = self.fetch_match(puuid, &match_id, hints).await;
            if outcome == ItemOutcome::Stored {
                run.seen.insert(match_id.clone());
                run.report.new_ids.push(match_id);
            }
            run.report.record(outcome);
        }
    }

    async fn fetch_match(&self, puuid: &str, match_id: &str, hints: &mut IdentityHints) -> ItemOutcome {
        let region = self.config.region.as_str();
        let subject = format!("match_id={} puuid={}", match_id, puuid);

        let payload = match self.api.match_payload(region, match_id).await {
            Ok(payload) => payload,
            Err(e) => {
                self.log.fetch_failed("match", &subject, &e);
                return ItemOutcome::Skipped(SkipReason::Failed(e.class()));
            }
        };

        let entry = ArchiveEntry::PlayerMatch { region, match_id };
        if let Err(e) = self.archive.store(&entry, &payload) {
            self.log.store_failed("match", &subject, &e);
            return ItemOutcome::Skipped(SkipReason::Failed(ErrorClass::Storage));
        }
        if let Ok(payload) = decode::<MatchDto>(&payload) {
            hints.observe_match(puuid, match_id, &payload);
        }

        if self.config.fetch_timeline {
            match self.api.timeline(region, match_id).await {
                Ok(timeline) => {
                    let entry = ArchiveEntry::PlayerTimeline { region, match_id };
                    if let Err(e) = self.archive.store(&entry, &timeline) {
                        self.log.store_failed("timeline", &subject, &e);
                    }
                }
                Err(e) => self.log.fetch_failed("timeline", &subject, &e),
            }
        }

        ItemOutcome::Stored
    }

    /// Summoner-by-name for each candidate name, then the participant id
    async fn fallback_summoner_id(&self, puuid: &str, hints: &IdentityHints) -> Option<String> {
        let platform = self.config.platform.as_str();

        for name in hints.candidate_names() {
            let subject = format!("puuid={} name={}", puuid, name);
            match self.api.summoner_by_name(platform, name).await {
                Ok(summoner) => {
                    let dto = decode::<SummonerDto>(&summoner).unwrap_or_default();
                    match dto.id.filter(|id| !id.is_empty()) {
                        Some(id) => {
                            tracing::debug!("Resolved summoner id for {} by name", puuid);
                            self.store_player(puuid, PlayerPayload::Summoner, &summoner);
                            return Some(id);
                        }
                        None => self.log.record(
                            ErrorClass::IdentityUnresolved,
                            &format!(
                                "summoner by name missing id {} keys={:?}",
                                subject,
                                response_keys(&summoner)
                            ),
                        ),
                    }
                }
                Err(e) => self.log.fetch_failed("summoner by name", &subject, &e),
            }
        }

        let recovered = hints.participant_summoner_id.clone();
        if recovered.is_some() {
            tracing::debug!("Recovered summoner id for {} from match participants", puuid);
        }
        recovered
    }

    /// Ranked entries, archived under the owning puuid when one is linked
    async fn fetch_ranked(&self, summoner_id: &str, run: &mut PlayerRun) {
        run.ranked_done.insert(summoner_id.to_string());
        let platform = run.links.platform(summoner_id, &self.config.platform).to_string();

        let ranked = match self.api.ranked_entries(&platform, summoner_id).await {
            Ok(ranked) => ranked,
            Err(e) => {
                self.log.fetch_failed(
                    "ranked",
                    &format!("summoner_id={} platform={}", summoner_id, platform),
                    &e,
                );
                return;
            }
        };

        let entry = match run.links.puuid(summoner_id) {
            Some(puuid) => ArchiveEntry::Player {
                puuid,
                payload: PlayerPayload::Ranked,
            },
            None => ArchiveEntry::UnlinkedRanked { summoner_id },
        };
        if let Err(e) = self.archive.store(&entry, &ranked) {
            self.log
                .store_failed("ranked", &format!("summoner_id={}", summoner_id), &e);
        }
    }

    fn store_player(&self, puuid: &str, payload: PlayerPayload, value: &Value) {
        let entry = ArchiveEntry::Player { puuid, payload };
        if let Err(e) = self.archive.store(&entry, value) {
            self.log
                .store_failed("player payload", &format!("puuid={}", puuid), &e);
        }
    }

    fn commit(&self, run: &PlayerRun) -> Result<(), IngestError> {
        let update = StateUpdate::new()
            .seen(fields::SEEN_MATCH_IDS, &run.seen)
            .timestamp(fields::LAST_RUN_TIME)
            .list(fields::SEED_RIOT_IDS, run.riot_ids.iter().cloned())
            .list(fields::SEED_PUUIDS, run.puuids.iter().cloned())
            .list(fields::SEED_SUMMONER_IDS, run.summoner_ids.iter().cloned());
        self.store
            .commit(Pipeline::Players.state_key(), update.into_document())?;
        Ok(())
    }
}

/// Configured values first, then stored ones not already present
fn union(configured: &[String], stored: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for item in configured.iter().cloned().chain(stored) {
        if !item.is_empty() && !merged.contains(&item) {
            merged.push(item);
        }
    }
    merged
}

fn response_keys(value: &Value) -> Vec<&str> {
    value
        .as_object()
        .map(|o| o.keys().map(String::as_str).collect())
        .unwrap_or_default()
}
