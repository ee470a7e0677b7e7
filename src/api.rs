use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;

use crate::dto::{
    CompetitionDetail, CompetitorDetail, CompetitorDisplay, EndMatchPayload, LoginPayload,
    MatchDetail, PaginatedPage, PaginatedQuery, RankingItem, RegisterPayload,
};

static CLIENT: OnceCell<Client> = OnceCell::new();

fn http_client(timeout: Duration) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")
    })
}

/// Non-2xx response, kept structured so callers can branch on 401/403.
#[derive(Debug, Clone)]
pub struct HttpFailure {
    pub status: StatusCode,
    pub body: String,
}

impl HttpFailure {
    pub fn auth_expired(&self) -> bool {
        matches!(
            self.status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        )
    }
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.trim().is_empty() {
            write!(f, "http {}", self.status)
        } else {
            write!(f, "{}", self.body.trim())
        }
    }
}

impl std::error::Error for HttpFailure {}

/// Which paginated list a table is backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListEndpoint {
    Competitions,
    Players,
    Teams,
    GameFormats,
    GameTypes,
}

impl ListEndpoint {
    fn path(self) -> &'static str {
        match self {
            ListEndpoint::Competitions => "Competition/GetPaginatedCompetitions",
            ListEndpoint::Players => "Competitor/GetPaginatedPlayers",
            ListEndpoint::Teams => "Competitor/GetPaginatedTeams",
            ListEndpoint::GameFormats => "GameFormat/GetPaginatedGameFormats",
            ListEndpoint::GameTypes => "GameType/GetPaginatedGameTypes",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base: String,
    timeout: Duration,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            timeout,
            token: None,
        }
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<String> {
        let client = http_client(self.timeout)?;
        let url = format!("{}/{path}", self.base);
        let mut req = client
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = self.token.as_deref() {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().with_context(|| format!("request failed: {path}"))?;
        let status = resp.status();
        let body = resp.text().context("failed reading body")?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(HttpFailure { status, body }.into())
        }
    }

    fn send_json<B: Serialize>(&self, method: Method, path: &str, body: &B) -> Result<String> {
        let value = serde_json::to_value(body).context("serialize request body")?;
        self.send(method, path, Some(&value))
    }

    fn get_parsed<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let raw = self.send(Method::GET, path, None)?;
        parse_body(&raw, path)
    }

    fn put_parsed<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let raw = self.send(Method::PUT, path, None)?;
        parse_body(&raw, path)
    }

    // ----- auth -----

    /// The service answers login/register with the bare token string.
    pub fn login(&self, payload: &LoginPayload) -> Result<String> {
        self.send_json(Method::POST, "User/Login", payload)
    }

    pub fn register(&self, payload: &RegisterPayload) -> Result<String> {
        self.send_json(Method::POST, "User/Register", payload)
    }

    // ----- paginated lists -----

    pub fn paginated(&self, list: ListEndpoint, query: &PaginatedQuery) -> Result<PaginatedPage> {
        let raw = self.send_json(Method::POST, list.path(), query)?;
        parse_body(&raw, list.path())
    }

    // ----- by id -----

    pub fn competition(&self, id: &str) -> Result<CompetitionDetail> {
        self.get_parsed(&format!("Competition/{id}"))
    }

    pub fn competitor(&self, id: &str) -> Result<CompetitorDetail> {
        self.get_parsed(&format!("Competitor/{id}"))
    }

    pub fn match_detail(&self, id: &str) -> Result<MatchDetail> {
        self.get_parsed(&format!("Match/{id}"))
    }

    // ----- ranking -----

    pub fn competition_ranking(&self, id: &str) -> Result<Vec<RankingItem>> {
        self.get_parsed(&format!("Competition/GetCompetitionRanking/{id}"))
    }

    pub fn competition_winners(&self, id: &str) -> Result<Vec<CompetitorDisplay>> {
        self.get_parsed(&format!("Competition/GetCompetitionWinners/{id}"))
    }

    // ----- competition lifecycle -----

    pub fn stop_competition_registration(&self, id: &str) -> Result<CompetitionDetail> {
        self.put_parsed(&format!("Competition/StopCompetitionRegistration/{id}"))
    }

    pub fn start_competition(&self, id: &str) -> Result<CompetitionDetail> {
        self.put_parsed(&format!("Competition/StartCompetition/{id}"))
    }

    pub fn end_competition(&self, id: &str) -> Result<CompetitionDetail> {
        self.put_parsed(&format!("Competition/EndCompetition/{id}"))
    }

    pub fn cancel_competition(&self, id: &str) -> Result<CompetitionDetail> {
        self.put_parsed(&format!("Competition/CancelCompetition/{id}"))
    }

    // ----- competition competitors -----

    pub fn players_not_in_competition(&self, id: &str) -> Result<Vec<CompetitorDisplay>> {
        self.get_parsed(&format!("Competitor/GetPlayersNotInCompetition/{id}"))
    }

    pub fn teams_addable_to_competition(&self, id: &str) -> Result<Vec<CompetitorDisplay>> {
        self.get_parsed(&format!(
            "Competitor/GetTeamsThatCanBeAddedToCompetition/{id}"
        ))
    }

    pub fn add_competitor_admin(&self, id: &str, competitor_id: &str) -> Result<CompetitionDetail> {
        self.put_parsed(&format!(
            "Competition/AddCompetitorToCompetition/Competition/{id}/Competitor/{competitor_id}"
        ))
    }

    pub fn add_competitor_self(&self, id: &str) -> Result<CompetitionDetail> {
        self.put_parsed(&format!("Competition/AddCompetitorToCompetition/{id}"))
    }

    pub fn remove_competitor_admin(
        &self,
        id: &str,
        competitor_id: &str,
    ) -> Result<CompetitionDetail> {
        self.put_parsed(&format!(
            "Competition/RemoveCompetitorFromCompetition/Competition/{id}/Competitor/{competitor_id}"
        ))
    }

    pub fn remove_competitor_self(&self, id: &str) -> Result<CompetitionDetail> {
        self.put_parsed(&format!("Competition/RemoveCompetitorFromCompetition/{id}"))
    }

    // ----- team players -----

    pub fn players_not_in_team(&self, id: &str) -> Result<Vec<CompetitorDisplay>> {
        self.get_parsed(&format!("Competitor/GetPlayersNotInTeam/{id}"))
    }

    pub fn add_player_to_team_admin(&self, team_id: &str, player_id: &str) -> Result<String> {
        self.send(
            Method::POST,
            &format!("TeamPlayer/AddPlayerToTeam/Team/{team_id}/Player/{player_id}"),
            None,
        )
    }

    pub fn add_player_to_team_self(&self, team_id: &str) -> Result<String> {
        self.send(
            Method::POST,
            &format!("TeamPlayer/AddPlayerToTeam/Team/{team_id}"),
            None,
        )
    }

    pub fn change_team_player_status_admin(
        &self,
        team_id: &str,
        player_id: &str,
    ) -> Result<String> {
        self.send(
            Method::PUT,
            &format!("TeamPlayer/ChangeTeamPlayerStatus/Team/{team_id}/Player/{player_id}"),
            None,
        )
    }

    pub fn change_team_player_status_self(&self, team_id: &str) -> Result<String> {
        self.send(
            Method::PUT,
            &format!("TeamPlayer/ChangeTeamPlayerStatus/Team/{team_id}"),
            None,
        )
    }

    pub fn remove_player_from_team_admin(&self, team_id: &str, player_id: &str) -> Result<String> {
        self.send(
            Method::DELETE,
            &format!("TeamPlayer/RemovePlayerFromTeam/Team/{team_id}/Player/{player_id}"),
            None,
        )
    }

    pub fn remove_player_from_team_self(&self, team_id: &str) -> Result<String> {
        self.send(
            Method::DELETE,
            &format!("TeamPlayer/RemovePlayerFromTeam/Team/{team_id}"),
            None,
        )
    }

    // ----- match lifecycle -----

    pub fn start_match(&self, id: &str) -> Result<MatchDetail> {
        self.put_parsed(&format!("Match/StartMatch/{id}"))
    }

    pub fn end_match(&self, id: &str, payload: &EndMatchPayload) -> Result<MatchDetail> {
        let raw = self.send_json(Method::PUT, &format!("Match/EndMatch/{id}"), payload)?;
        parse_body(&raw, "Match/EndMatch")
    }

    pub fn cancel_match(&self, id: &str) -> Result<MatchDetail> {
        self.put_parsed(&format!("Match/CancelMatch/{id}"))
    }

    // ----- points -----

    pub fn add_point_value(&self, match_id: &str, player_id: &str, value: i64) -> Result<String> {
        self.send(
            Method::PUT,
            &format!("Point/Match/{match_id}/Player/{player_id}"),
            Some(&serde_json::json!({ "value": value })),
        )
    }

    // ----- win ratings -----

    pub fn competitor_win_ratings(&self, id: &str) -> Result<Value> {
        self.get_parsed(&format!("Competitor/getCompetitorWinRatings/{id}"))
    }

    // ----- creates -----

    pub fn create_one_vs_all_competition(&self, body: &Value) -> Result<String> {
        self.send(Method::POST, "Competition/OneVSAllCompetition", Some(body))
    }

    pub fn create_tournament_competition(&self, body: &Value) -> Result<String> {
        self.send(Method::POST, "Competition/TournamentCompetition", Some(body))
    }

    pub fn create_player(&self, body: &Value) -> Result<String> {
        self.send(Method::POST, "Competitor/Player", Some(body))
    }

    pub fn create_team(&self, body: &Value) -> Result<String> {
        self.send(Method::POST, "Competitor/Team", Some(body))
    }

    pub fn create_game_format(&self, body: &Value) -> Result<String> {
        self.send(Method::POST, "GameFormat", Some(body))
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(raw: &str, path: &str) -> Result<T> {
    let trimmed = raw.trim();
    serde_json::from_str(trimmed).with_context(|| format!("invalid json from {path}"))
}
