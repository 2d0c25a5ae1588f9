//! Typed views over upstream payloads
//!
//! Payloads are archived verbatim; these structs are decoded from the same
//! JSON only to navigate it. Every field is optional or defaulted so schema
//! drift shows up as a missing value rather than a decode failure.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Decodes a typed view from an archived payload
pub fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, serde_json::Error> {
    T::deserialize(value)
}

/// Accepts ids sent either as strings or as numbers
fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// ===== lolesports schedule API =====

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LeaguesResponse {
    pub data: LeaguesData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LeaguesData {
    pub leagues: Vec<League>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct League {
    #[serde(deserialize_with = "opt_id")]
    pub id: Option<String>,
    pub slug: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScheduleResponse {
    pub data: ScheduleData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScheduleData {
    pub schedule: Schedule,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub events: Vec<ScheduleEvent>,
    pub pages: SchedulePages,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchedulePages {
    pub older: Option<String>,
    pub newer: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScheduleEvent {
    #[serde(deserialize_with = "opt_id")]
    pub id: Option<String>,
    #[serde(rename = "startTime")]
    pub start_time: Option<String>,
    #[serde(rename = "match")]
    pub match_ref: Option<IdRef>,
}

impl ScheduleEvent {
    /// The event id, falling back to the id of the embedded match
    pub fn event_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or_else(|| self.match_ref.as_ref().and_then(|m| m.id.as_deref()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdRef {
    #[serde(deserialize_with = "opt_id")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventDetailsResponse {
    pub data: EventDetailsData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventDetailsData {
    pub event: EventDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventDetail {
    #[serde(deserialize_with = "opt_id")]
    pub id: Option<String>,
    pub league: Option<LeagueRef>,
    #[serde(rename = "match")]
    pub match_detail: Option<EventMatch>,
}

impl EventDetail {
    pub fn league_slug(&self) -> Option<&str> {
        self.league.as_ref().and_then(|l| l.slug.as_deref())
    }

    pub fn games(&self) -> &[Game] {
        self.match_detail
            .as_ref()
            .map(|m| m.games.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LeagueRef {
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventMatch {
    pub games: Vec<Game>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Game {
    #[serde(deserialize_with = "opt_id")]
    pub id: Option<String>,
    #[serde(rename = "gameId", deserialize_with = "opt_id")]
    pub game_id: Option<String>,
    pub state: Option<GameState>,
}

impl Game {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().or(self.game_id.as_deref())
    }
}

/// Lifecycle of an esports game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameState {
    Unscheduled,
    InProgress,
    Completed,
    Unneeded,
    #[serde(other)]
    Unknown,
}

impl GameState {
    /// Only started or finished games carry telemetry worth ingesting
    pub fn is_material(&self) -> bool {
        matches!(self, Self::Completed | Self::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unscheduled => "unscheduled",
            Self::InProgress => "inProgress",
            Self::Completed => "completed",
            Self::Unneeded => "unneeded",
            Self::Unknown => "unknown",
        }
    }
}

/// One record of the esports games metadata summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMeta {
    #[serde(rename = "gameId")]
    pub game_id: String,
    #[serde(rename = "eventId")]
    pub event_id: String,
    #[serde(rename = "leagueSlug")]
    pub league_slug: String,
    pub state: String,
}

// ===== Riot API =====

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccountDto {
    pub puuid: Option<String>,
    #[serde(rename = "gameName")]
    pub game_name: Option<String>,
    #[serde(rename = "tagLine")]
    pub tag_line: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SummonerDto {
    pub id: Option<String>,
    pub puuid: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LeagueListDto {
    pub entries: Vec<LeagueItemDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LeagueItemDto {
    #[serde(rename = "summonerId")]
    pub summoner_id: Option<String>,
    pub puuid: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MatchDto {
    pub info: MatchInfoDto,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MatchInfoDto {
    pub participants: Vec<ParticipantDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParticipantDto {
    pub puuid: Option<String>,
    #[serde(rename = "summonerId")]
    pub summoner_id: Option<String>,
    #[serde(rename = "summonerName")]
    pub summoner_name: Option<String>,
}

impl MatchDto {
    /// The participant entry belonging to `puuid`
    pub fn participant(&self, puuid: &str) -> Option<&ParticipantDto> {
        self.info
            .participants
            .iter()
            .find(|p| p.puuid.as_deref() == Some(puuid))
    }
}

// ===== Live-stats feed =====

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WindowDto {
    pub frames: Option<Vec<WindowFrame>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WindowFrame {
    #[serde(rename = "blueTeam")]
    pub blue_team: Option<TeamFrame>,
    #[serde(rename = "redTeam")]
    pub red_team: Option<TeamFrame>,
}

/// Team totals; the feed sends `null` for values it has not computed yet
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeamFrame {
    #[serde(rename = "totalGold")]
    pub total_gold: Option<f64>,
    #[serde(rename = "totalKills")]
    pub total_kills: Option<f64>,
}

impl TeamFrame {
    fn has_data(&self) -> bool {
        [self.total_gold, self.total_kills]
            .into_iter()
            .flatten()
            .any(|v| v != 0.0)
    }
}

impl WindowDto {
    /// True if any frame shows gold or kills for either team
    pub fn has_data(&self) -> bool {
        self.frames.iter().flatten().any(|f| {
            [&f.blue_team, &f.red_team]
                .into_iter()
                .flatten()
                .any(TeamFrame::has_data)
        })
    }
}
