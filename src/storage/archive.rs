//! Id-addressed raw payload archive
//!
//! Every payload lives at a path derived from its natural id:
//!
//! | Entry | Path |
//! |-------|------|
//! | League catalog | `raw/esports_gw/leagues/leagues.json` |
//! | Schedule page | `raw/esports_gw/schedules/<leagueId>[.page<N>].json` |
//! | Event details | `raw/esports_gw/events/<eventId>.json` |
//! | Ladder match | `raw/match_v5/<region>/<matchId>.json` |
//! | Ladder timeline | `raw/match_v5/<region>/<matchId>_timeline.json` |
//! | Player payload | `raw/lolapi/players/<puuid>/<kind>.json` |
//! | Player match | `raw/lolapi/matches/<region>/<matchId>.json` |
//! | Player timeline | `raw/lolapi/matches/<region>/timeline/<matchId>.json` |
//! | Unlinked ranked | `raw/lolapi/ranked/<summonerId>.json` |
//! | Live stats | `raw/livestats/<leagueSlug>/<gameId>/{window,details}.json` |

use crate::storage::{read_json, write_json_atomic, StorageError, StorageResult};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Kinds of per-player payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPayload {
    Account,
    Summoner,
    Mastery,
    Challenges,
    Ranked,
}

impl PlayerPayload {
    fn file_name(&self) -> &'static str {
        match self {
            Self::Account => "account.json",
            Self::Summoner => "summoner.json",
            Self::Mastery => "mastery.json",
            Self::Challenges => "challenges.json",
            Self::Ranked => "ranked.json",
        }
    }
}

/// A single addressable payload in the archive
#[derive(Debug, Clone, Copy)]
pub enum ArchiveEntry<'a> {
    LeagueCatalog,
    Schedule { league_id: &'a str, page: u32 },
    Event { event_id: &'a str },
    LadderMatch { region: &'a str, match_id: &'a str },
    LadderTimeline { region: &'a str, match_id: &'a str },
    Player { puuid: &'a str, payload: PlayerPayload },
    PlayerMatch { region: &'a str, match_id: &'a str },
    PlayerTimeline { region: &'a str, match_id: &'a str },
    UnlinkedRanked { summoner_id: &'a str },
    LiveStatsWindow { league_slug: &'a str, game_id: &'a str },
    LiveStatsDetails { league_slug: &'a str, game_id: &'a str },
}

/// The on-disk archive rooted at the configured data and meta directories
#[derive(Debug, Clone)]
pub struct Archive {
    data_dir: PathBuf,
    meta_dir: PathBuf,
}

impl Archive {
    pub fn new(data_dir: impl Into<PathBuf>, meta_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            meta_dir: meta_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn meta_dir(&self) -> &Path {
        &self.meta_dir
    }

    /// Directory holding the per-pipeline run logs
    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// Path of a metadata file (e.g. `esports_games.json`)
    pub fn meta_path(&self, name: &str) -> PathBuf {
        self.meta_dir.join(name)
    }

    /// Resolves the archive path of an entry
    ///
    /// Ids are used verbatim as path components, so anything that could
    /// escape its directory is rejected.
    pub fn path(&self, entry: &ArchiveEntry<'_>) -> StorageResult<PathBuf> {
        let raw = self.data_dir.join("raw");
        let path = match *entry {
            ArchiveEntry::LeagueCatalog => raw.join("esports_gw/leagues/leagues.json"),
            ArchiveEntry::Schedule { league_id, page } => {
                let league_id = checked_id(league_id)?;
                let file = if page == 0 {
                    format!("{}.json", league_id)
                } else {
                    format!("{}.page{}.json", league_id, page)
                };
                raw.join("esports_gw/schedules").join(file)
            }
            ArchiveEntry::Event { event_id } => raw
                .join("esports_gw/events")
                .join(format!("{}.json", checked_id(event_id)?)),
            ArchiveEntry::LadderMatch { region, match_id } => raw
                .join("match_v5")
                .join(checked_id(region)?)
                .join(format!("{}.json", checked_id(match_id)?)),
            ArchiveEntry::LadderTimeline { region, match_id } => raw
                .join("match_v5")
                .join(checked_id(region)?)
                .join(format!("{}_timeline.json", checked_id(match_id)?)),
            ArchiveEntry::Player { puuid, payload } => raw
                .join("lolapi/players")
                .join(checked_id(puuid)?)
                .join(payload.file_name()),
            ArchiveEntry::PlayerMatch { region, match_id } => raw
                .join("lolapi/matches")
                .join(checked_id(region)?)
                .join(format!("{}.json", checked_id(match_id)?)),
            ArchiveEntry::PlayerTimeline { region, match_id } => raw
                .join("lolapi/matches")
                .join(checked_id(region)?)
                .join("timeline")
                .join(format!("{}.json", checked_id(match_id)?)),
            ArchiveEntry::UnlinkedRanked { summoner_id } => raw
                .join("lolapi/ranked")
                .join(format!("{}.json", checked_id(summoner_id)?)),
            ArchiveEntry::LiveStatsWindow {
                league_slug,
                game_id,
            } => raw
                .join("livestats")
                .join(checked_id(league_slug)?)
                .join(checked_id(game_id)?)
                .join("window.json"),
            ArchiveEntry::LiveStatsDetails {
                league_slug,
                game_id,
            } => raw
                .join("livestats")
                .join(checked_id(league_slug)?)
                .join(checked_id(game_id)?)
                .join("details.json"),
        };
        Ok(path)
    }

    /// Returns true if the entry has already been archived
    pub fn exists(&self, entry: &ArchiveEntry<'_>) -> bool {
        self.path(entry).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Writes a payload to its archive path, replacing any previous copy
    pub fn store(&self, entry: &ArchiveEntry<'_>, payload: &Value) -> StorageResult<PathBuf> {
        let path = self.path(entry)?;
        write_json_atomic(&path, payload)?;
        tracing::trace!("Archived {}", path.display());
        Ok(path)
    }

    /// Reads an archived payload back, if present
    pub fn load(&self, entry: &ArchiveEntry<'_>) -> StorageResult<Option<Value>> {
        read_json(&self.path(entry)?)
    }
}

/// Rejects ids that are empty or could be interpreted as a path
fn checked_id(id: &str) -> StorageResult<&str> {
    let invalid = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StorageError::InvalidId(id.to_string()));
    }
    Ok(id)
}
