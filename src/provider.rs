use std::collections::HashSet;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::Result;

use crate::api::{ApiClient, HttpFailure, ListEndpoint};
use crate::auth;
use crate::config::Config;
use crate::dto::{
    FilterRule, GameType, PaginatedQuery, RequestFilters, SortDirection, win_rating_rows,
};
use crate::export;
use crate::state::{ChoiceSource, Delta, ProviderCommand};

/// Spawns the worker thread owning all network I/O. Commands arrive over the
/// channel; results and failures go back as deltas. Detail fetches run on a
/// small pool with an in-flight set so duplicate commands coalesce.
pub fn spawn_provider(
    config: &Config,
    token: Option<String>,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) {
    let base = config.api_base.clone().unwrap_or_default();
    let timeout = config.request_timeout;
    thread::spawn(move || {
        let mut client = ApiClient::new(base, timeout);
        client.set_token(token);
        let pool = build_fetch_pool();
        let inflight: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));

        while let Ok(cmd) = cmd_rx.recv() {
            handle_command(&mut client, &tx, pool.as_ref(), &inflight, cmd);
        }
    });
}

fn build_fetch_pool() -> Option<rayon::ThreadPool> {
    let threads = std::env::var("ARENA_FETCH_THREADS")
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(4)
        .clamp(1, 16);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .ok()
}

fn handle_command(
    client: &mut ApiClient,
    tx: &Sender<Delta>,
    pool: Option<&rayon::ThreadPool>,
    inflight: &Arc<Mutex<HashSet<String>>>,
    cmd: ProviderCommand,
) {
    match cmd {
        // Auth runs inline because it swaps the client's token.
        ProviderCommand::Login(payload) => match client.login(&payload) {
            Ok(token) => {
                let token = token.trim().trim_matches('"').to_string();
                if let Err(err) = auth::save_token(&token) {
                    let _ = tx.send(Delta::Log(format!("[WARN] Session not saved: {err}")));
                }
                client.set_token(Some(token.clone()));
                let _ = tx.send(Delta::LoggedIn { token });
            }
            Err(err) => report(tx, err),
        },
        ProviderCommand::Register(payload) => match client.register(&payload) {
            Ok(token) => {
                let token = token.trim().trim_matches('"').to_string();
                if let Err(err) = auth::save_token(&token) {
                    let _ = tx.send(Delta::Log(format!("[WARN] Session not saved: {err}")));
                }
                client.set_token(Some(token.clone()));
                let _ = tx.send(Delta::LoggedIn { token });
            }
            Err(err) => report(tx, err),
        },
        ProviderCommand::Logout => {
            auth::clear_session();
            client.set_token(None);
            let _ = tx.send(Delta::Log("[INFO] Signed out".to_string()));
        }

        ProviderCommand::FetchPage {
            list,
            request_id,
            query,
        } => match client.paginated(list, &query) {
            Ok(page) => {
                let _ = tx.send(Delta::Page {
                    list,
                    request_id,
                    items: page.items,
                    total: page.total,
                });
            }
            Err(err) => report(tx, err),
        },

        ProviderCommand::FetchCompetition { id } => {
            spawn_detail(client, tx, pool, inflight, format!("competition:{id}"), {
                move |client, tx| {
                    let detail = client.competition(&id)?;
                    let _ = tx.send(Delta::Competition(Box::new(detail)));
                    Ok(())
                }
            });
        }
        ProviderCommand::FetchRanking { id } => {
            spawn_detail(client, tx, pool, inflight, format!("ranking:{id}"), {
                move |client, tx| {
                    let items = client.competition_ranking(&id)?;
                    let _ = tx.send(Delta::Ranking {
                        competition_id: id.clone(),
                        items,
                    });
                    Ok(())
                }
            });
        }
        ProviderCommand::FetchWinners { id } => {
            spawn_detail(client, tx, pool, inflight, format!("winners:{id}"), {
                move |client, tx| {
                    let items = client.competition_winners(&id)?;
                    let _ = tx.send(Delta::Winners {
                        competition_id: id.clone(),
                        items,
                    });
                    Ok(())
                }
            });
        }
        ProviderCommand::FetchCompetitor { id } => {
            spawn_detail(client, tx, pool, inflight, format!("competitor:{id}"), {
                move |client, tx| {
                    let detail = client.competitor(&id)?;
                    let _ = tx.send(Delta::Competitor(Box::new(detail)));
                    let ratings = client.competitor_win_ratings(&id)?;
                    let _ = tx.send(Delta::WinRatings {
                        competitor_id: id.clone(),
                        rows: win_rating_rows(&ratings),
                    });
                    Ok(())
                }
            });
        }
        ProviderCommand::FetchMatch { id } => {
            spawn_detail(client, tx, pool, inflight, format!("match:{id}"), {
                move |client, tx| {
                    let detail = client.match_detail(&id)?;
                    let _ = tx.send(Delta::Match(Box::new(detail)));
                    Ok(())
                }
            });
        }

        ProviderCommand::FetchGameTypes => {
            let outcome = client
                .paginated(ListEndpoint::GameTypes, &choice_query())
                .map(|page| {
                    page.items
                        .into_iter()
                        .filter_map(|item| serde_json::from_value::<GameType>(item).ok())
                        .collect::<Vec<_>>()
                });
            match outcome {
                Ok(types) => {
                    let _ = tx.send(Delta::GameTypes(types));
                }
                Err(err) => report(tx, err),
            }
        }
        ProviderCommand::FetchGameFormatChoices => {
            match client.paginated(ListEndpoint::GameFormats, &choice_query()) {
                Ok(page) => {
                    let options = page
                        .items
                        .iter()
                        .filter_map(|item| {
                            let id = item.get("id")?.as_str()?.to_string();
                            let name = item.get("name")?.as_str()?.to_string();
                            Some((id, name))
                        })
                        .collect();
                    let _ = tx.send(Delta::GameFormatChoices(options));
                }
                Err(err) => report(tx, err),
            }
        }
        ProviderCommand::FetchChoices { source, id } => {
            let outcome = match source {
                ChoiceSource::PlayersNotInCompetition => client.players_not_in_competition(&id),
                ChoiceSource::TeamsForCompetition => client.teams_addable_to_competition(&id),
                ChoiceSource::PlayersNotInTeam => client.players_not_in_team(&id),
            };
            match outcome {
                Ok(items) => {
                    let _ = tx.send(Delta::Choices { source, items });
                }
                Err(err) => report(tx, err),
            }
        }

        ProviderCommand::StopRegistration { id } => {
            competition_update(tx, client.stop_competition_registration(&id), "Registrations stopped");
        }
        ProviderCommand::StartCompetition { id } => {
            competition_update(tx, client.start_competition(&id), "Competition started");
        }
        ProviderCommand::EndCompetition { id } => {
            competition_update(tx, client.end_competition(&id), "Competition ended");
        }
        ProviderCommand::CancelCompetition { id } => {
            competition_update(tx, client.cancel_competition(&id), "Competition canceled");
        }

        ProviderCommand::AddCompetitor {
            competition_id,
            competitor_id,
        } => {
            let from_dialog = competitor_id.is_some();
            let outcome = match competitor_id.as_deref() {
                Some(competitor) => client.add_competitor_admin(&competition_id, competitor),
                None => client.add_competitor_self(&competition_id),
            };
            match outcome {
                Ok(detail) => {
                    let _ = tx.send(Delta::Competition(Box::new(detail)));
                    if from_dialog {
                        let _ = tx.send(Delta::DialogDone {
                            message: "Competitor registered".to_string(),
                        });
                    } else {
                        let _ = tx.send(Delta::Log("[INFO] Registered to competition".to_string()));
                    }
                }
                Err(err) => report(tx, err),
            }
        }
        ProviderCommand::RemoveCompetitor {
            competition_id,
            competitor_id,
        } => {
            let outcome = match competitor_id.as_deref() {
                Some(competitor) => client.remove_competitor_admin(&competition_id, competitor),
                None => client.remove_competitor_self(&competition_id),
            };
            match outcome {
                Ok(detail) => {
                    let _ = tx.send(Delta::Competition(Box::new(detail)));
                    let _ = tx.send(Delta::Log("[INFO] Competitor removed".to_string()));
                }
                Err(err) => report(tx, err),
            }
        }

        ProviderCommand::AddTeamMember { team_id, player_id } => {
            let from_dialog = player_id.is_some();
            let outcome = match player_id.as_deref() {
                Some(player) => client.add_player_to_team_admin(&team_id, player),
                None => client.add_player_to_team_self(&team_id),
            };
            team_update(client, tx, &team_id, outcome, from_dialog, "Player added to team");
        }
        ProviderCommand::ToggleTeamMember { team_id, player_id } => {
            let outcome = match player_id.as_deref() {
                Some(player) => client.change_team_player_status_admin(&team_id, player),
                None => client.change_team_player_status_self(&team_id),
            };
            team_update(client, tx, &team_id, outcome, false, "Member status changed");
        }
        ProviderCommand::RemoveTeamMember { team_id, player_id } => {
            let outcome = match player_id.as_deref() {
                Some(player) => client.remove_player_from_team_admin(&team_id, player),
                None => client.remove_player_from_team_self(&team_id),
            };
            team_update(client, tx, &team_id, outcome, false, "Player removed from team");
        }

        ProviderCommand::StartMatch { id } => match client.start_match(&id) {
            Ok(detail) => {
                let _ = tx.send(Delta::Match(Box::new(detail)));
                let _ = tx.send(Delta::Log("[INFO] Match started".to_string()));
            }
            Err(err) => report(tx, err),
        },
        ProviderCommand::EndMatch { id, payload } => match client.end_match(&id, &payload) {
            Ok(detail) => {
                let _ = tx.send(Delta::Match(Box::new(detail)));
                let _ = tx.send(Delta::DialogDone {
                    message: "Match ended".to_string(),
                });
            }
            Err(err) => report(tx, err),
        },
        ProviderCommand::CancelMatch { id } => match client.cancel_match(&id) {
            Ok(detail) => {
                let _ = tx.send(Delta::Match(Box::new(detail)));
                let _ = tx.send(Delta::Log("[INFO] Match canceled".to_string()));
            }
            Err(err) => report(tx, err),
        },

        ProviderCommand::AddPoint {
            match_id,
            player_id,
            value,
        } => match client.add_point_value(&match_id, &player_id, value) {
            Ok(_) => {
                let _ = tx.send(Delta::DialogDone {
                    message: "Point value added".to_string(),
                });
                refetch_match(client, tx, &match_id);
            }
            Err(err) => report(tx, err),
        },

        ProviderCommand::CreateOneVsAllCompetition(body) => {
            create(tx, client.create_one_vs_all_competition(&body), "Competition created");
        }
        ProviderCommand::CreateTournamentCompetition(body) => {
            create(tx, client.create_tournament_competition(&body), "Competition created");
        }
        ProviderCommand::CreatePlayer(body) => {
            create(tx, client.create_player(&body), "Player created");
        }
        ProviderCommand::CreateTeam(body) => {
            create(tx, client.create_team(&body), "Team created");
        }
        ProviderCommand::CreateGameFormat(body) => {
            create(tx, client.create_game_format(&body), "Game format created");
        }

        ProviderCommand::ExportRanking {
            competition_id,
            competition_name,
            path,
        } => match client.competition_ranking(&competition_id) {
            Ok(items) => match export::write_ranking(&path, &competition_name, &items) {
                Ok(report) => {
                    let _ = tx.send(Delta::Log(format!(
                        "[INFO] Exported {} ranking rows to {path}",
                        report.rows
                    )));
                }
                Err(err) => report_err(tx, &err),
            },
            Err(err) => report(tx, err),
        },
    }
}

/// Detail fetches go through the pool; a key already in flight is dropped,
/// the screen will be refreshed by the response that is on its way.
fn spawn_detail<F>(
    client: &ApiClient,
    tx: &Sender<Delta>,
    pool: Option<&rayon::ThreadPool>,
    inflight: &Arc<Mutex<HashSet<String>>>,
    key: String,
    job: F,
) where
    F: FnOnce(&ApiClient, &Sender<Delta>) -> Result<()> + Send + 'static,
{
    {
        let mut guard = inflight.lock().expect("inflight lock poisoned");
        if guard.contains(&key) {
            return;
        }
        guard.insert(key.clone());
    }

    let client = client.clone();
    let tx = tx.clone();
    let inflight = inflight.clone();
    let task = move || {
        if let Err(err) = job(&client, &tx) {
            report(&tx, err);
        }
        let mut guard = inflight.lock().expect("inflight lock poisoned");
        guard.remove(&key);
    };

    if let Some(pool) = pool {
        pool.spawn(task);
    } else {
        thread::spawn(task);
    }
}

fn competition_update(
    tx: &Sender<Delta>,
    outcome: Result<crate::dto::CompetitionDetail>,
    message: &str,
) {
    match outcome {
        Ok(detail) => {
            let _ = tx.send(Delta::Competition(Box::new(detail)));
            let _ = tx.send(Delta::Log(format!("[INFO] {message}")));
        }
        Err(err) => report(tx, err),
    }
}

/// Membership endpoints answer plain text; the screen is refreshed by
/// re-fetching the competitor, the way the page re-loads its model.
fn team_update(
    client: &ApiClient,
    tx: &Sender<Delta>,
    team_id: &str,
    outcome: Result<String>,
    from_dialog: bool,
    message: &str,
) {
    match outcome {
        Ok(_) => {
            if from_dialog {
                let _ = tx.send(Delta::DialogDone {
                    message: message.to_string(),
                });
            } else {
                let _ = tx.send(Delta::Log(format!("[INFO] {message}")));
            }
            match client.competitor(team_id) {
                Ok(detail) => {
                    let _ = tx.send(Delta::Competitor(Box::new(detail)));
                }
                Err(err) => report(tx, err),
            }
            match client.competitor_win_ratings(team_id) {
                Ok(ratings) => {
                    let _ = tx.send(Delta::WinRatings {
                        competitor_id: team_id.to_string(),
                        rows: win_rating_rows(&ratings),
                    });
                }
                Err(err) => report(tx, err),
            }
        }
        Err(err) => report(tx, err),
    }
}

fn refetch_match(client: &ApiClient, tx: &Sender<Delta>, match_id: &str) {
    match client.match_detail(match_id) {
        Ok(detail) => {
            let _ = tx.send(Delta::Match(Box::new(detail)));
        }
        Err(err) => report(tx, err),
    }
}

fn create(tx: &Sender<Delta>, outcome: Result<String>, message: &str) {
    match outcome {
        Ok(_) => {
            let _ = tx.send(Delta::DialogDone {
                message: message.to_string(),
            });
        }
        Err(err) => report(tx, err),
    }
}

/// Choice lists load the first fifty entries sorted by name; the dialogs
/// never page.
fn choice_query() -> PaginatedQuery {
    PaginatedQuery {
        page_index: 0,
        page_size: 50,
        column_name_for_sorting: "name".to_string(),
        sort_direction: SortDirection::Asc,
        request_filters: RequestFilters {
            logical_operator: 0,
            filters: vec![FilterRule {
                path: "name".to_string(),
                value: String::new(),
            }],
        },
    }
}

/// Every failure funnels into the alert; 401/403 additionally tears the
/// session down.
fn report(tx: &Sender<Delta>, err: anyhow::Error) {
    if let Some(failure) = err.downcast_ref::<HttpFailure>() {
        if failure.auth_expired() {
            auth::clear_session();
            let _ = tx.send(Delta::AuthExpired);
            return;
        }
        let _ = tx.send(Delta::Alert(failure.to_string()));
        return;
    }
    let _ = tx.send(Delta::Alert(format!("{err:#}")));
}

fn report_err(tx: &Sender<Delta>, err: &anyhow::Error) {
    let _ = tx.send(Delta::Alert(format!("{err:#}")));
}
