//! State module for tracking pipeline progress
//!
//! Each pipeline owns one state document: a flat JSON object holding grow-only
//! id sets, sticky seed lists and run timestamps. Documents are always read and
//! written whole.
//!
//! # Components
//!
//! - `StateStore`: read-entire / commit-merged access to documents by key
//! - `FileStateStore`: the JSON-file backed store used in production
//! - `SeenSet`: a sorted, grow-only set of processed ids
//! - `StateUpdate`: builder for the top-level fields passed to a commit

mod document;
mod store;

pub use document::{string_list, SeenSet, StateUpdate};
pub use store::{FileStateStore, StateStore};

/// A state document: the top-level fields of one pipeline's progress record
pub type StateDocument = serde_json::Map<String, serde_json::Value>;

/// Field names used in state documents
pub mod fields {
    pub const LAST_RUN_TIME: &str = "lastRunTime";
    pub const LAST_SCHEDULE_TIME: &str = "lastScheduleTime";
    pub const SEEN_EVENT_IDS: &str = "seenEventIds";
    pub const SEEN_GAME_IDS: &str = "seenGameIds";
    pub const SEEN_MATCH_IDS: &str = "seenMatchIds";
    pub const SEED_PLAYERS: &str = "seedPlayers";
    pub const SEED_RIOT_IDS: &str = "seedRiotIds";
    pub const SEED_PUUIDS: &str = "seedPuuids";
    pub const SEED_SUMMONER_IDS: &str = "seedSummonerIds";
    pub const DOWNLOADED_GAME_IDS: &str = "downloadedGameIds";
    pub const SKIPPED_GAME_IDS: &str = "skippedGameIds";
}
