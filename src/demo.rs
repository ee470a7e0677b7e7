use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::{Value, json};

use crate::api::ListEndpoint;
use crate::auth;
use crate::dto::{
    CompetitionDetail, CompetitionStatus, CompetitionType, CompetitorDisplay, CompetitorType,
    GameType, MatchDetail, MatchDisplay, MatchStatus, PaginatedQuery, PointDisplay, RankingItem,
    SortDirection, TeamPlayerLink,
};
use crate::export;
use crate::state::{ChoiceSource, Delta, ProviderCommand};

const PLAYER_NAMES: [&str; 12] = [
    "A. Stone", "R. Vega", "M. Holt", "J. Nox", "T. Vale", "K. Rook", "L. Park", "D. Moss",
    "I. Noor", "C. Hale", "V. Ash", "E. Pike",
];
const TEAM_NAMES: [&str; 4] = ["Alpha", "Omega", "Vertex", "Harbor"];
const GAME_TYPE_NAMES: [&str; 3] = ["Table tennis", "Darts", "Chess"];

/// Offline provider answering the real command set from a generated world, so
/// the binary runs without a service behind it.
pub fn spawn_demo_provider(tx: Sender<Delta>, cmd_rx: Receiver<ProviderCommand>) {
    thread::spawn(move || {
        let mut world = DemoWorld::seed();
        let _ = tx.send(Delta::Log(
            "[INFO] Demo mode: no service configured, data is generated".to_string(),
        ));
        while let Ok(cmd) = cmd_rx.recv() {
            world.handle(&tx, cmd);
        }
    });
}

struct DemoPlayer {
    id: String,
    name: String,
}

struct DemoTeam {
    id: String,
    name: String,
    members: Vec<(String, bool)>,
}

struct DemoCompetition {
    id: String,
    name: String,
    location: String,
    status: CompetitionStatus,
    competition_type: CompetitionType,
    competitor_type: CompetitorType,
    game_type: GameType,
    win_at: Option<u32>,
    duration_in_minutes: Option<u32>,
    team_size: Option<u32>,
    competitor_ids: Vec<String>,
    match_ids: Vec<String>,
}

struct DemoMatch {
    id: String,
    competition_id: String,
    competitor_one: String,
    competitor_two: String,
    status: MatchStatus,
    points_one: Option<i64>,
    points_two: Option<i64>,
    start_offset_hours: i64,
    points: Vec<PointDisplay>,
}

pub struct DemoWorld {
    players: Vec<DemoPlayer>,
    teams: Vec<DemoTeam>,
    game_types: Vec<GameType>,
    game_formats: Vec<Value>,
    competitions: Vec<DemoCompetition>,
    matches: Vec<DemoMatch>,
    session_player: String,
}

impl DemoWorld {
    pub fn seed() -> Self {
        let mut rng = rand::thread_rng();

        let players: Vec<DemoPlayer> = PLAYER_NAMES
            .iter()
            .map(|name| DemoPlayer {
                id: fresh_id(&mut rng, "p"),
                name: (*name).to_string(),
            })
            .collect();

        let teams: Vec<DemoTeam> = TEAM_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| DemoTeam {
                id: fresh_id(&mut rng, "t"),
                name: (*name).to_string(),
                members: players
                    .iter()
                    .skip(i * 3)
                    .take(3)
                    .map(|p| (p.id.clone(), true))
                    .collect(),
            })
            .collect();

        let game_types: Vec<GameType> = GAME_TYPE_NAMES
            .iter()
            .map(|name| GameType {
                id: fresh_id(&mut rng, "gt"),
                name: (*name).to_string(),
            })
            .collect();

        let game_formats: Vec<Value> = game_types
            .iter()
            .map(|gt| {
                json!({
                    "id": fresh_id(&mut rng, "gf"),
                    "name": format!("{} classic", gt.name),
                    "gameType": { "id": gt.id, "name": gt.name },
                    "competitorType": "PLAYER",
                    "teamSize": Value::Null,
                    "winAt": 11,
                    "durationInMinutes": Value::Null,
                })
            })
            .collect();

        let mut competitions = Vec::new();
        let mut matches = Vec::new();
        let statuses = [
            CompetitionStatus::Organizing,
            CompetitionStatus::Started,
            CompetitionStatus::Finished,
        ];
        for (i, status) in statuses.into_iter().enumerate() {
            let id = fresh_id(&mut rng, "c");
            let competitor_ids: Vec<String> =
                players.iter().take(4 + i).map(|p| p.id.clone()).collect();
            let mut match_ids = Vec::new();
            if status != CompetitionStatus::Organizing {
                for pair in competitor_ids.windows(2) {
                    let match_id = fresh_id(&mut rng, "m");
                    let finished = status == CompetitionStatus::Finished || rng.gen_bool(0.5);
                    matches.push(DemoMatch {
                        id: match_id.clone(),
                        competition_id: id.clone(),
                        competitor_one: pair[0].clone(),
                        competitor_two: pair[1].clone(),
                        status: if finished {
                            MatchStatus::Finished
                        } else {
                            MatchStatus::NotStarted
                        },
                        points_one: finished.then(|| rng.gen_range(0..12)),
                        points_two: finished.then(|| rng.gen_range(0..12)),
                        start_offset_hours: rng.gen_range(-48..48),
                        points: Vec::new(),
                    });
                    match_ids.push(match_id);
                }
            }
            competitions.push(DemoCompetition {
                id,
                name: format!("{} open {}", GAME_TYPE_NAMES[i % 3], 2026 + i as u32),
                location: "Main hall".to_string(),
                status,
                competition_type: if i % 2 == 0 {
                    CompetitionType::OneVsAll
                } else {
                    CompetitionType::Tournament
                },
                competitor_type: CompetitorType::Player,
                game_type: game_types[i % game_types.len()].clone(),
                win_at: Some(11),
                duration_in_minutes: None,
                team_size: None,
                competitor_ids,
                match_ids,
            });
        }

        let session_player = players[0].id.clone();
        Self {
            players,
            teams,
            game_types,
            game_formats,
            competitions,
            matches,
            session_player,
        }
    }

    pub fn handle(&mut self, tx: &Sender<Delta>, cmd: ProviderCommand) {
        match cmd {
            ProviderCommand::Login(payload) => {
                let admin = payload.email.contains("admin");
                let token = demo_token(admin, &self.session_player);
                let _ = auth::save_token(&token);
                let _ = tx.send(Delta::LoggedIn { token });
            }
            ProviderCommand::Register(payload) => {
                let token = demo_token(false, &self.session_player);
                let _ = auth::save_token(&token);
                let _ = tx.send(Delta::Log(format!(
                    "[INFO] Registered {}",
                    payload.username
                )));
                let _ = tx.send(Delta::LoggedIn { token });
            }
            ProviderCommand::Logout => {
                auth::clear_session();
                let _ = tx.send(Delta::Log("[INFO] Signed out".to_string()));
            }
            ProviderCommand::FetchPage {
                list,
                request_id,
                query,
            } => {
                let rows = self.list_rows(list);
                let (items, total) = paginate(rows, &query);
                let _ = tx.send(Delta::Page {
                    list,
                    request_id,
                    items,
                    total,
                });
            }
            ProviderCommand::FetchCompetition { id } => {
                if let Some(detail) = self.competition_detail(&id) {
                    let _ = tx.send(Delta::Competition(Box::new(detail)));
                }
            }
            ProviderCommand::FetchRanking { id } => {
                let _ = tx.send(Delta::Ranking {
                    competition_id: id.clone(),
                    items: self.ranking(&id),
                });
            }
            ProviderCommand::FetchWinners { id } => {
                let items = self
                    .ranking(&id)
                    .first()
                    .map(|top| vec![top.competitor.clone()])
                    .unwrap_or_default();
                let _ = tx.send(Delta::Winners {
                    competition_id: id,
                    items,
                });
            }
            ProviderCommand::FetchCompetitor { id } => {
                if let Some(detail) = self.competitor_detail(&id) {
                    let _ = tx.send(Delta::Competitor(Box::new(detail)));
                }
                let _ = tx.send(Delta::WinRatings {
                    competitor_id: id.clone(),
                    rows: self.win_ratings(&id),
                });
            }
            ProviderCommand::FetchMatch { id } => {
                if let Some(detail) = self.match_detail(&id) {
                    let _ = tx.send(Delta::Match(Box::new(detail)));
                }
            }
            ProviderCommand::FetchGameTypes => {
                let _ = tx.send(Delta::GameTypes(self.game_types.clone()));
            }
            ProviderCommand::FetchGameFormatChoices => {
                let options = self
                    .game_formats
                    .iter()
                    .filter_map(|f| {
                        Some((
                            f.get("id")?.as_str()?.to_string(),
                            f.get("name")?.as_str()?.to_string(),
                        ))
                    })
                    .collect();
                let _ = tx.send(Delta::GameFormatChoices(options));
            }
            ProviderCommand::FetchChoices { source, id } => {
                let items = match source {
                    ChoiceSource::PlayersNotInCompetition => {
                        let entered = self
                            .competitions
                            .iter()
                            .find(|c| c.id == id)
                            .map(|c| c.competitor_ids.clone())
                            .unwrap_or_default();
                        self.players
                            .iter()
                            .filter(|p| !entered.contains(&p.id))
                            .map(|p| display(&p.id, &p.name, CompetitorType::Player))
                            .collect()
                    }
                    ChoiceSource::TeamsForCompetition => self
                        .teams
                        .iter()
                        .map(|t| display(&t.id, &t.name, CompetitorType::Team))
                        .collect(),
                    ChoiceSource::PlayersNotInTeam => {
                        let members = self
                            .teams
                            .iter()
                            .find(|t| t.id == id)
                            .map(|t| t.members.iter().map(|(p, _)| p.clone()).collect::<Vec<_>>())
                            .unwrap_or_default();
                        self.players
                            .iter()
                            .filter(|p| !members.contains(&p.id))
                            .map(|p| display(&p.id, &p.name, CompetitorType::Player))
                            .collect()
                    }
                };
                let _ = tx.send(Delta::Choices { source, items });
            }
            ProviderCommand::StopRegistration { id } => {
                self.set_competition_status(tx, &id, CompetitionStatus::NotStarted, "Registrations stopped");
            }
            ProviderCommand::StartCompetition { id } => {
                self.set_competition_status(tx, &id, CompetitionStatus::Started, "Competition started");
            }
            ProviderCommand::EndCompetition { id } => {
                self.set_competition_status(tx, &id, CompetitionStatus::Finished, "Competition ended");
            }
            ProviderCommand::CancelCompetition { id } => {
                self.set_competition_status(tx, &id, CompetitionStatus::Canceled, "Competition canceled");
            }
            ProviderCommand::AddCompetitor {
                competition_id,
                competitor_id,
            } => {
                let from_dialog = competitor_id.is_some();
                let competitor = competitor_id.unwrap_or_else(|| self.session_player.clone());
                self.add_competitor(&competition_id, &competitor);
                if let Some(detail) = self.competition_detail(&competition_id) {
                    let _ = tx.send(Delta::Competition(Box::new(detail)));
                }
                if from_dialog {
                    let _ = tx.send(Delta::DialogDone {
                        message: "Competitor registered".to_string(),
                    });
                } else {
                    let _ = tx.send(Delta::Log("[INFO] Registered to competition".to_string()));
                }
            }
            ProviderCommand::RemoveCompetitor {
                competition_id,
                competitor_id,
            } => {
                let competitor = competitor_id.unwrap_or_else(|| self.session_player.clone());
                if let Some(competition) =
                    self.competitions.iter_mut().find(|c| c.id == competition_id)
                {
                    competition.competitor_ids.retain(|id| *id != competitor);
                }
                if let Some(detail) = self.competition_detail(&competition_id) {
                    let _ = tx.send(Delta::Competition(Box::new(detail)));
                }
                let _ = tx.send(Delta::Log("[INFO] Competitor removed".to_string()));
            }
            ProviderCommand::AddTeamMember { team_id, player_id } => {
                let player = player_id.clone().unwrap_or_else(|| self.session_player.clone());
                if let Some(team) = self.teams.iter_mut().find(|t| t.id == team_id) {
                    if !team.members.iter().any(|(id, _)| *id == player) {
                        team.members.push((player, true));
                    }
                }
                if player_id.is_some() {
                    let _ = tx.send(Delta::DialogDone {
                        message: "Player added to team".to_string(),
                    });
                }
                self.send_competitor(tx, &team_id);
            }
            ProviderCommand::ToggleTeamMember { team_id, player_id } => {
                let player = player_id.unwrap_or_else(|| self.session_player.clone());
                if let Some(team) = self.teams.iter_mut().find(|t| t.id == team_id) {
                    if let Some(member) = team.members.iter_mut().find(|(id, _)| *id == player) {
                        member.1 = !member.1;
                    }
                }
                let _ = tx.send(Delta::Log("[INFO] Member status changed".to_string()));
                self.send_competitor(tx, &team_id);
            }
            ProviderCommand::RemoveTeamMember { team_id, player_id } => {
                let player = player_id.unwrap_or_else(|| self.session_player.clone());
                if let Some(team) = self.teams.iter_mut().find(|t| t.id == team_id) {
                    team.members.retain(|(id, _)| *id != player);
                }
                let _ = tx.send(Delta::Log("[INFO] Player removed from team".to_string()));
                self.send_competitor(tx, &team_id);
            }
            ProviderCommand::StartMatch { id } => {
                self.set_match_status(tx, &id, MatchStatus::Started, "Match started");
            }
            ProviderCommand::EndMatch { id, payload } => {
                if let Some(m) = self.matches.iter_mut().find(|m| m.id == id) {
                    m.status = MatchStatus::Finished;
                    m.points_one = Some(payload.competitor_one_points);
                    m.points_two = Some(payload.competitor_two_points);
                }
                if let Some(detail) = self.match_detail(&id) {
                    let _ = tx.send(Delta::Match(Box::new(detail)));
                }
                let _ = tx.send(Delta::DialogDone {
                    message: "Match ended".to_string(),
                });
            }
            ProviderCommand::CancelMatch { id } => {
                self.set_match_status(tx, &id, MatchStatus::Canceled, "Match canceled");
            }
            ProviderCommand::AddPoint {
                match_id,
                player_id,
                value,
            } => {
                let player_name = self.player_name(&player_id);
                let mut rng = rand::thread_rng();
                if let Some(m) = self.matches.iter_mut().find(|m| m.id == match_id) {
                    m.points.push(PointDisplay {
                        id: fresh_id(&mut rng, "pt"),
                        value,
                        player: player_name,
                    });
                }
                let _ = tx.send(Delta::DialogDone {
                    message: "Point value added".to_string(),
                });
                if let Some(detail) = self.match_detail(&match_id) {
                    let _ = tx.send(Delta::Match(Box::new(detail)));
                }
            }
            ProviderCommand::CreateOneVsAllCompetition(body)
            | ProviderCommand::CreateTournamentCompetition(body) => {
                let mut rng = rand::thread_rng();
                let name = body
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("New competition")
                    .to_string();
                let tournament = body
                    .get("competitionType")
                    .and_then(Value::as_str)
                    .is_some_and(|t| t == "TOURNAMENT");
                self.competitions.push(DemoCompetition {
                    id: fresh_id(&mut rng, "c"),
                    name,
                    location: body
                        .get("location")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    status: CompetitionStatus::Organizing,
                    competition_type: if tournament {
                        CompetitionType::Tournament
                    } else {
                        CompetitionType::OneVsAll
                    },
                    competitor_type: CompetitorType::Player,
                    game_type: self.game_types[0].clone(),
                    win_at: Some(11),
                    duration_in_minutes: None,
                    team_size: None,
                    competitor_ids: Vec::new(),
                    match_ids: Vec::new(),
                });
                let _ = tx.send(Delta::DialogDone {
                    message: "Competition created".to_string(),
                });
            }
            ProviderCommand::CreatePlayer(body) => {
                let mut rng = rand::thread_rng();
                self.players.push(DemoPlayer {
                    id: fresh_id(&mut rng, "p"),
                    name: body
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("New player")
                        .to_string(),
                });
                let _ = tx.send(Delta::DialogDone {
                    message: "Player created".to_string(),
                });
            }
            ProviderCommand::CreateTeam(body) => {
                let mut rng = rand::thread_rng();
                self.teams.push(DemoTeam {
                    id: fresh_id(&mut rng, "t"),
                    name: body
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("New team")
                        .to_string(),
                    members: Vec::new(),
                });
                let _ = tx.send(Delta::DialogDone {
                    message: "Team created".to_string(),
                });
            }
            ProviderCommand::CreateGameFormat(body) => {
                let mut rng = rand::thread_rng();
                let game_type = body
                    .get("gameType")
                    .and_then(Value::as_str)
                    .and_then(|id| self.game_types.iter().find(|gt| gt.id == id))
                    .cloned()
                    .unwrap_or_else(|| self.game_types[0].clone());
                let mut format = body;
                if let Some(obj) = format.as_object_mut() {
                    obj.insert("id".to_string(), json!(fresh_id(&mut rng, "gf")));
                    obj.insert(
                        "gameType".to_string(),
                        json!({ "id": game_type.id, "name": game_type.name }),
                    );
                    let competitor_type = obj
                        .get("competitorType")
                        .and_then(Value::as_u64)
                        .unwrap_or(0);
                    obj.insert(
                        "competitorType".to_string(),
                        json!(if competitor_type == 0 { "PLAYER" } else { "TEAM" }),
                    );
                }
                self.game_formats.push(format);
                let _ = tx.send(Delta::DialogDone {
                    message: "Game format created".to_string(),
                });
            }
            ProviderCommand::ExportRanking {
                competition_id,
                competition_name,
                path,
            } => {
                let items = self.ranking(&competition_id);
                match export::write_ranking(&path, &competition_name, &items) {
                    Ok(report) => {
                        let _ = tx.send(Delta::Log(format!(
                            "[INFO] Exported {} ranking rows to {path}",
                            report.rows
                        )));
                    }
                    Err(err) => {
                        let _ = tx.send(Delta::Alert(format!("{err:#}")));
                    }
                }
            }
        }
    }

    // ----- world views -----

    fn player_name(&self, id: &str) -> String {
        self.players
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn competitor_name(&self, id: &str) -> String {
        self.teams
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| self.player_name(id))
    }

    fn list_rows(&self, list: ListEndpoint) -> Vec<Value> {
        match list {
            ListEndpoint::Competitions => self
                .competitions
                .iter()
                .map(|c| {
                    json!({
                        "id": c.id,
                        "name": c.name,
                        "competitionType": type_label(c.competition_type),
                        "status": status_value(c.status),
                        "gameType": c.game_type.name,
                        "competitorType": competitor_type_label(c.competitor_type),
                    })
                })
                .collect(),
            ListEndpoint::Players => self
                .players
                .iter()
                .map(|p| {
                    json!({
                        "id": p.id,
                        "name": p.name,
                        "numberOfCompetitions": self.competition_count(&p.id),
                        "numberOfMatches": self.match_count(&p.id),
                        "numberOfTeams": self
                            .teams
                            .iter()
                            .filter(|t| t.members.iter().any(|(id, _)| *id == p.id))
                            .count(),
                    })
                })
                .collect(),
            ListEndpoint::Teams => self
                .teams
                .iter()
                .map(|t| {
                    json!({
                        "id": t.id,
                        "name": t.name,
                        "numberOfCompetitions": self.competition_count(&t.id),
                        "numberOfMatches": self.match_count(&t.id),
                        "numberOfPlayers": t.members.len(),
                        "numberOfActivePlayers": t.members.iter().filter(|(_, a)| *a).count(),
                    })
                })
                .collect(),
            ListEndpoint::GameFormats => self.game_formats.clone(),
            ListEndpoint::GameTypes => self
                .game_types
                .iter()
                .map(|gt| json!({ "id": gt.id, "name": gt.name }))
                .collect(),
        }
    }

    fn competition_count(&self, competitor_id: &str) -> usize {
        self.competitions
            .iter()
            .filter(|c| c.competitor_ids.iter().any(|id| id == competitor_id))
            .count()
    }

    fn match_count(&self, competitor_id: &str) -> usize {
        self.matches
            .iter()
            .filter(|m| m.competitor_one == competitor_id || m.competitor_two == competitor_id)
            .count()
    }

    fn competition_detail(&self, id: &str) -> Option<CompetitionDetail> {
        let c = self.competitions.iter().find(|c| c.id == id)?;
        let start = Utc::now() + ChronoDuration::hours(24);
        Some(CompetitionDetail {
            id: c.id.clone(),
            name: c.name.clone(),
            competition_type: Some(c.competition_type),
            location: c.location.clone(),
            initial_start_time: Some(start),
            actualized_start_time: Some(start),
            status: c.status,
            break_in_minutes: None,
            game_type: c.game_type.clone(),
            competitor_type: c.competitor_type,
            team_size: c.team_size,
            win_at: c.win_at,
            duration_in_minutes: c.duration_in_minutes,
            stage_level: (c.competition_type == CompetitionType::Tournament).then_some(0),
            competitors: c
                .competitor_ids
                .iter()
                .map(|cid| display(cid, &self.competitor_name(cid), c.competitor_type))
                .collect(),
            matches: c
                .match_ids
                .iter()
                .filter_map(|mid| self.match_display(mid))
                .collect(),
        })
    }

    fn match_display(&self, id: &str) -> Option<MatchDisplay> {
        let m = self.matches.iter().find(|m| m.id == id)?;
        let competition = self
            .competitions
            .iter()
            .find(|c| c.id == m.competition_id)?;
        let one = self.competitor_name(&m.competitor_one);
        let two = self.competitor_name(&m.competitor_two);
        Some(MatchDisplay {
            id: m.id.clone(),
            status: m.status,
            competitors: format!("{one} - {two}"),
            competition: competition.name.clone(),
            competitors_points: match (m.points_one, m.points_two) {
                (Some(a), Some(b)) => Some(format!("{a} - {b}")),
                _ => None,
            },
            winner: self.winner_name(m),
            start_time: Some(Utc::now() + ChronoDuration::hours(m.start_offset_hours)),
        })
    }

    fn winner_name(&self, m: &DemoMatch) -> Option<String> {
        let (a, b) = (m.points_one?, m.points_two?);
        if a == b {
            return None;
        }
        let id = if a > b {
            &m.competitor_one
        } else {
            &m.competitor_two
        };
        Some(self.competitor_name(id))
    }

    fn competitor_detail(&self, id: &str) -> Option<crate::dto::CompetitorDetail> {
        let matches: Vec<MatchDisplay> = self
            .matches
            .iter()
            .filter(|m| m.competitor_one == id || m.competitor_two == id)
            .filter_map(|m| self.match_display(&m.id))
            .collect();
        let competitions: Vec<_> = self
            .competitions
            .iter()
            .filter(|c| c.competitor_ids.iter().any(|cid| cid == id))
            .map(|c| crate::dto::CompetitionDisplay {
                id: c.id.clone(),
                name: c.name.clone(),
                status: c.status,
                game_type: Some(c.game_type.name.clone()),
                competitor_type: Some(c.competitor_type),
            })
            .collect();
        let won: Vec<String> = matches
            .iter()
            .filter(|m| m.winner.as_deref() == Some(self.competitor_name(id).as_str()))
            .map(|m| m.id.clone())
            .collect();

        if let Some(team) = self.teams.iter().find(|t| t.id == id) {
            return Some(crate::dto::CompetitorDetail {
                id: team.id.clone(),
                name: team.name.clone(),
                matches,
                won_matches: won,
                competitions,
                points: None,
                teams: None,
                players: Some(
                    team.members
                        .iter()
                        .map(|(pid, _)| display(pid, &self.player_name(pid), CompetitorType::Player))
                        .collect(),
                ),
                team_players: Some(
                    team.members
                        .iter()
                        .map(|(pid, active)| TeamPlayerLink {
                            id: None,
                            team_id: team.id.clone(),
                            player_id: pid.clone(),
                            is_active: *active,
                        })
                        .collect(),
                ),
            });
        }

        let player = self.players.iter().find(|p| p.id == id)?;
        Some(crate::dto::CompetitorDetail {
            id: player.id.clone(),
            name: player.name.clone(),
            matches,
            won_matches: won,
            competitions,
            points: Some(Vec::new()),
            teams: Some(
                self.teams
                    .iter()
                    .filter(|t| t.members.iter().any(|(pid, _)| *pid == player.id))
                    .map(|t| crate::dto::TeamMemberDisplay {
                        id: t.id.clone(),
                        name: t.name.clone(),
                        number_of_players: Some(t.members.len() as u32),
                        number_of_active_players: Some(
                            t.members.iter().filter(|(_, a)| *a).count() as u32,
                        ),
                    })
                    .collect(),
            ),
            players: None,
            team_players: None,
        })
    }

    fn match_detail(&self, id: &str) -> Option<MatchDetail> {
        let m = self.matches.iter().find(|m| m.id == id)?;
        let competition = self
            .competitions
            .iter()
            .find(|c| c.id == m.competition_id)?;
        Some(MatchDetail {
            id: m.id.clone(),
            location: competition.location.clone(),
            start_time: Some(Utc::now() + ChronoDuration::hours(m.start_offset_hours)),
            end_time: None,
            status: m.status,
            competitor_one: display(
                &m.competitor_one,
                &self.competitor_name(&m.competitor_one),
                competition.competitor_type,
            ),
            competitor_two: display(
                &m.competitor_two,
                &self.competitor_name(&m.competitor_two),
                competition.competitor_type,
            ),
            competition: crate::dto::CompetitionDisplay {
                id: competition.id.clone(),
                name: competition.name.clone(),
                status: competition.status,
                game_type: Some(competition.game_type.name.clone()),
                competitor_type: Some(competition.competitor_type),
            },
            competitor_one_points: m.points_one,
            competitor_two_points: m.points_two,
            winner: self.winner_name(m).map(|name| {
                let id = if m.points_one >= m.points_two {
                    &m.competitor_one
                } else {
                    &m.competitor_two
                };
                display(id, &name, competition.competitor_type)
            }),
            stage_level: None,
            stage_index: None,
            points: m.points.clone(),
        })
    }

    fn ranking(&self, competition_id: &str) -> Vec<RankingItem> {
        let Some(competition) = self.competitions.iter().find(|c| c.id == competition_id) else {
            return Vec::new();
        };
        let mut items: Vec<RankingItem> = competition
            .competitor_ids
            .iter()
            .map(|cid| {
                let name = self.competitor_name(cid);
                let mut wins = 0i64;
                let mut points = 0i64;
                for m in self
                    .matches
                    .iter()
                    .filter(|m| m.competition_id == competition.id)
                {
                    if m.competitor_one == *cid {
                        points += m.points_one.unwrap_or(0);
                        if m.points_one > m.points_two {
                            wins += 1;
                        }
                    } else if m.competitor_two == *cid {
                        points += m.points_two.unwrap_or(0);
                        if m.points_two > m.points_one {
                            wins += 1;
                        }
                    }
                }
                RankingItem {
                    id: cid.clone(),
                    competitor: display(cid, &name, competition.competitor_type),
                    wins,
                    points,
                }
            })
            .collect();
        items.sort_by(|a, b| (b.wins, b.points).cmp(&(a.wins, a.points)));
        items
    }

    fn win_ratings(&self, competitor_id: &str) -> Vec<crate::dto::WinRatingRow> {
        self.game_types
            .iter()
            .map(|gt| {
                let total = self.match_count(competitor_id).max(1) as f64;
                let wins = self
                    .matches
                    .iter()
                    .filter(|m| {
                        (m.competitor_one == competitor_id && m.points_one > m.points_two)
                            || (m.competitor_two == competitor_id && m.points_two > m.points_one)
                    })
                    .count() as f64;
                crate::dto::WinRatingRow {
                    game_type: gt.name.clone(),
                    win_rating: wins / total,
                }
            })
            .collect()
    }

    // ----- mutations -----

    fn add_competitor(&mut self, competition_id: &str, competitor_id: &str) {
        if let Some(competition) = self.competitions.iter_mut().find(|c| c.id == competition_id) {
            if !competition.competitor_ids.iter().any(|id| id == competitor_id) {
                competition.competitor_ids.push(competitor_id.to_string());
            }
        }
    }

    fn set_competition_status(
        &mut self,
        tx: &Sender<Delta>,
        id: &str,
        status: CompetitionStatus,
        message: &str,
    ) {
        if let Some(competition) = self.competitions.iter_mut().find(|c| c.id == id) {
            competition.status = status;
        }
        if let Some(detail) = self.competition_detail(id) {
            let _ = tx.send(Delta::Competition(Box::new(detail)));
        }
        let _ = tx.send(Delta::Log(format!("[INFO] {message}")));
    }

    fn set_match_status(&mut self, tx: &Sender<Delta>, id: &str, status: MatchStatus, message: &str) {
        if let Some(m) = self.matches.iter_mut().find(|m| m.id == id) {
            m.status = status;
        }
        if let Some(detail) = self.match_detail(id) {
            let _ = tx.send(Delta::Match(Box::new(detail)));
        }
        let _ = tx.send(Delta::Log(format!("[INFO] {message}")));
    }

    fn send_competitor(&self, tx: &Sender<Delta>, id: &str) {
        if let Some(detail) = self.competitor_detail(id) {
            let _ = tx.send(Delta::Competitor(Box::new(detail)));
        }
        let _ = tx.send(Delta::WinRatings {
            competitor_id: id.to_string(),
            rows: self.win_ratings(id),
        });
    }
}

fn display(id: &str, name: &str, kind: CompetitorType) -> CompetitorDisplay {
    CompetitorDisplay {
        id: id.to_string(),
        name: name.to_string(),
        competitor_type: Some(kind),
    }
}

fn status_value(status: CompetitionStatus) -> Value {
    serde_json::to_value(status).unwrap_or(Value::Null)
}

fn type_label(kind: CompetitionType) -> &'static str {
    match kind {
        CompetitionType::OneVsAll => "ONE_VS_ALL",
        CompetitionType::Tournament => "TOURNAMENT",
    }
}

fn competitor_type_label(kind: CompetitorType) -> &'static str {
    match kind {
        CompetitorType::Player => "PLAYER",
        CompetitorType::Team => "TEAM",
    }
}

fn fresh_id(rng: &mut impl Rng, prefix: &str) -> String {
    let suffix: String = rng
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{prefix}-{}", suffix.to_lowercase())
}

/// Unsigned demo token carrying the same claims the real service issues.
fn demo_token(admin: bool, player_id: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = serde_json::json!({
        "http://schemas.microsoft.com/ws/2008/06/identity/claims/role":
            if admin { "Administrator" } else { "User" },
        "PlayerId": player_id,
    });
    let payload = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
    format!("{header}.{payload}.demo")
}

/// In-memory pagination mirroring the service's envelope: filter on the
/// query's path, sort by the named column, then slice the page.
pub fn paginate(mut rows: Vec<Value>, query: &PaginatedQuery) -> (Vec<Value>, usize) {
    let filter = query
        .request_filters
        .filters
        .first()
        .filter(|rule| !rule.path.is_empty() && !rule.value.is_empty());
    if let Some(rule) = filter {
        let needle = rule.value.to_lowercase();
        rows.retain(|row| {
            row.get(&rule.path)
                .map(field_text)
                .is_some_and(|text| text.to_lowercase().contains(&needle))
        });
    }

    let key = &query.column_name_for_sorting;
    if !key.is_empty() {
        rows.sort_by(|a, b| {
            let left = a.get(key);
            let right = b.get(key);
            match (left.and_then(Value::as_f64), right.and_then(Value::as_f64)) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
                _ => field_text(left.unwrap_or(&Value::Null))
                    .cmp(&field_text(right.unwrap_or(&Value::Null))),
            }
        });
        if query.sort_direction == SortDirection::Desc {
            rows.reverse();
        }
    }

    let total = rows.len();
    let start = (query.page_index * query.page_size).min(total);
    let end = (start + query.page_size).min(total);
    (rows[start..end].to_vec(), total)
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
