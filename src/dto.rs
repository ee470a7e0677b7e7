use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompetitionStatus {
    Organizing,
    NotStarted,
    Started,
    Finished,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    NotStarted,
    Started,
    Finished,
    Canceled,
    SpecialWinCompetitorOne,
    SpecialWinCompetitorTwo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompetitorType {
    Player,
    Team,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompetitionType {
    OneVsAll,
    Tournament,
}

/// Wire values are lowercase ("asc"/"desc"), matching the sort parameter the
/// service expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Administrator,
    User,
}

// ---------- paginated envelope ----------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedQuery {
    pub page_index: usize,
    pub page_size: usize,
    pub column_name_for_sorting: String,
    pub sort_direction: SortDirection,
    pub request_filters: RequestFilters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFilters {
    pub logical_operator: u8,
    pub filters: Vec<FilterRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterRule {
    pub path: String,
    pub value: String,
}

/// List rows stay dynamic so a single table component can serve every entity;
/// detail screens deserialize into the typed DTOs below.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatedPage {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub total: usize,
}

// ---------- display shapes ----------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorDisplay {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub competitor_type: Option<CompetitorType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionDisplay {
    pub id: String,
    pub name: String,
    pub status: CompetitionStatus,
    #[serde(default)]
    pub game_type: Option<String>,
    #[serde(default)]
    pub competitor_type: Option<CompetitorType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDisplay {
    pub id: String,
    pub status: MatchStatus,
    #[serde(default)]
    pub competitors: String,
    #[serde(default)]
    pub competition: String,
    #[serde(default)]
    pub competitors_points: Option<String>,
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointDisplay {
    pub id: String,
    pub value: i64,
    pub player: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingItem {
    pub id: String,
    pub competitor: CompetitorDisplay,
    pub wins: i64,
    pub points: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberDisplay {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub number_of_players: Option<u32>,
    #[serde(default)]
    pub number_of_active_players: Option<u32>,
}

// ---------- detail shapes ----------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameType {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameFormat {
    pub id: String,
    pub name: String,
    pub game_type: GameType,
    pub competitor_type: CompetitorType,
    #[serde(default)]
    pub team_size: Option<u32>,
    #[serde(default)]
    pub win_at: Option<u32>,
    #[serde(default)]
    pub duration_in_minutes: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionDetail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub competition_type: Option<CompetitionType>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub initial_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actualized_start_time: Option<DateTime<Utc>>,
    pub status: CompetitionStatus,
    #[serde(default)]
    pub break_in_minutes: Option<u32>,
    pub game_type: GameType,
    pub competitor_type: CompetitorType,
    #[serde(default)]
    pub team_size: Option<u32>,
    #[serde(default)]
    pub win_at: Option<u32>,
    #[serde(default)]
    pub duration_in_minutes: Option<u32>,
    #[serde(default)]
    pub stage_level: Option<u32>,
    #[serde(default)]
    pub competitors: Vec<CompetitorDisplay>,
    #[serde(default)]
    pub matches: Vec<MatchDisplay>,
}

/// Covers both competitor variants: players carry `teams` and `points`,
/// teams carry `players` and `teamPlayers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorDetail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub matches: Vec<MatchDisplay>,
    #[serde(default)]
    pub won_matches: Vec<String>,
    #[serde(default)]
    pub competitions: Vec<CompetitionDisplay>,
    #[serde(default)]
    pub points: Option<Vec<String>>,
    #[serde(default)]
    pub teams: Option<Vec<TeamMemberDisplay>>,
    #[serde(default)]
    pub players: Option<Vec<CompetitorDisplay>>,
    #[serde(default)]
    pub team_players: Option<Vec<TeamPlayerLink>>,
}

impl CompetitorDetail {
    pub fn is_team(&self) -> bool {
        self.players.is_some()
    }

    pub fn is_player(&self) -> bool {
        self.teams.is_some()
    }

    pub fn member_is_active(&self, player_id: &str) -> Option<bool> {
        self.team_players
            .as_deref()?
            .iter()
            .find(|link| link.player_id == player_id)
            .map(|link| link.is_active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPlayerLink {
    #[serde(default)]
    pub id: Option<String>,
    pub team_id: String,
    pub player_id: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetail {
    pub id: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub status: MatchStatus,
    pub competitor_one: CompetitorDisplay,
    pub competitor_two: CompetitorDisplay,
    pub competition: CompetitionDisplay,
    #[serde(default)]
    pub competitor_one_points: Option<i64>,
    #[serde(default)]
    pub competitor_two_points: Option<i64>,
    #[serde(default)]
    pub winner: Option<CompetitorDisplay>,
    #[serde(default)]
    pub stage_level: Option<u32>,
    #[serde(default)]
    pub stage_index: Option<u32>,
    #[serde(default)]
    pub points: Vec<PointDisplay>,
}

/// The win-ratings endpoint answers a plain map of game-type name to rating;
/// rows are derived client-side.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinRatingRow {
    pub game_type: String,
    pub win_rating: f64,
}

pub fn win_rating_rows(raw: &Value) -> Vec<WinRatingRow> {
    let Some(map) = raw.as_object() else {
        return Vec::new();
    };
    map.iter()
        .map(|(game_type, value)| WinRatingRow {
            game_type: game_type.clone(),
            win_rating: value.as_f64().unwrap_or_default(),
        })
        .collect()
}

// ---------- command payloads ----------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndMatchPayload {
    pub competitor_one_points: i64,
    pub competitor_two_points: i64,
}
