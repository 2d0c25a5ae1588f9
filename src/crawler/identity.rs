//! Player identity links and fallback hints
//!
//! A summoner id is needed for ranked lookups but the summoner-by-puuid
//! endpoint does not always return one. While a player is ingested, every
//! payload that mentions them contributes hints (display names, participant
//! summoner ids, the platform of their matches) that the fallback ladder can
//! use later.

use crate::api::models::MatchDto;
use std::collections::HashMap;

/// Platform id from a match id prefix (`KR_123` → `kr`)
pub fn platform_from_match_id(match_id: &str) -> Option<String> {
    match match_id.split_once('_') {
        Some((prefix, rest)) if !prefix.is_empty() && !rest.is_empty() => {
            Some(prefix.to_ascii_lowercase())
        }
        _ => None,
    }
}

/// Hints about one player collected during ingestion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityHints {
    pub summoner_name: Option<String>,
    pub account_name: Option<String>,
    pub participant_name: Option<String>,
    pub participant_summoner_id: Option<String>,
    pub platform: Option<String>,
}

impl IdentityHints {
    /// Takes hints from the player's own participant entry in a match
    ///
    /// The first value seen for each hint wins.
    pub fn observe_match(&mut self, puuid: &str, match_id: &str, payload: &MatchDto) {
        if self.platform.is_none() {
            self.platform = platform_from_match_id(match_id);
        }

        let Some(participant) = payload.participant(puuid) else {
            return;
        };
        if self.participant_name.is_none() {
            self.participant_name = non_empty(participant.summoner_name.as_deref());
        }
        if self.participant_summoner_id.is_none() {
            self.participant_summoner_id = non_empty(participant.summoner_id.as_deref());
        }
    }

    /// Distinct display names to try with summoner-by-name, in priority order
    pub fn candidate_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in [
            &self.summoner_name,
            &self.account_name,
            &self.participant_name,
        ]
        .into_iter()
        .flatten()
        {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name);
            }
        }
        names
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Per-run summoner id → puuid and platform links
#[derive(Debug, Clone, Default)]
pub struct IdentityLinks {
    puuid_by_summoner: HashMap<String, String>,
    platform_by_summoner: HashMap<String, String>,
}

impl IdentityLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&mut self, puuid: &str, summoner_id: &str, platform: Option<&str>) {
        self.puuid_by_summoner
            .insert(summoner_id.to_string(), puuid.to_string());
        if let Some(platform) = platform {
            self.platform_by_summoner
                .insert(summoner_id.to_string(), platform.to_string());
        }
    }

    pub fn puuid(&self, summoner_id: &str) -> Option<&str> {
        self.puuid_by_summoner.get(summoner_id).map(String::as_str)
    }

    /// Platform to query for `summoner_id`, defaulting to `fallback`
    pub fn platform<'a>(&'a self, summoner_id: &str, fallback: &'a str) -> &'a str {
        self.platform_by_summoner
            .get(summoner_id)
            .map(String::as_str)
            .unwrap_or(fallback)
    }
}
