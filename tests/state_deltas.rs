use arena_terminal::api::ListEndpoint;
use arena_terminal::config::Config;
use arena_terminal::dto::{
    CompetitionDetail, CompetitionStatus, CompetitorDisplay, CompetitorType, GameType, UserRole,
};
use arena_terminal::forms;
use arena_terminal::state::{
    AppState, Delta, DialogKind, Screen, apply_delta,
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;

fn new_state() -> AppState {
    AppState::new(&Config::default())
}

fn token(role: &str, player_id: Option<&str>) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let mut claims = json!({
        "http://schemas.microsoft.com/ws/2008/06/identity/claims/role": role,
    });
    if let Some(player_id) = player_id {
        claims["PlayerId"] = json!(player_id);
    }
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    format!("{header}.{payload}.sig")
}

fn sample_competition(id: &str, status: CompetitionStatus) -> CompetitionDetail {
    CompetitionDetail {
        id: id.to_string(),
        name: "Spring open".to_string(),
        competition_type: None,
        location: "Main hall".to_string(),
        initial_start_time: None,
        actualized_start_time: None,
        status,
        break_in_minutes: None,
        game_type: GameType {
            id: "gt1".to_string(),
            name: "Darts".to_string(),
        },
        competitor_type: CompetitorType::Player,
        team_size: None,
        win_at: Some(11),
        duration_in_minutes: None,
        stage_level: None,
        competitors: vec![CompetitorDisplay {
            id: "p1".to_string(),
            name: "A. Stone".to_string(),
            competitor_type: Some(CompetitorType::Player),
        }],
        matches: Vec::new(),
    }
}

#[test]
fn alert_delta_sets_the_single_alert_slot() {
    let mut state = new_state();
    apply_delta(&mut state, Delta::Alert("boom".to_string()));
    assert_eq!(state.alert.as_deref(), Some("boom"));

    apply_delta(&mut state, Delta::Alert("newer".to_string()));
    assert_eq!(state.alert.as_deref(), Some("newer"));
}

#[test]
fn logged_in_decodes_claims_and_lands_on_overview() {
    let mut state = new_state();
    apply_delta(
        &mut state,
        Delta::LoggedIn {
            token: token("Administrator", None),
        },
    );
    assert!(state.session.is_some());
    assert!(state.is_admin());
    assert_eq!(state.screen, Screen::Overview);
}

#[test]
fn logged_in_with_garbage_token_alerts_instead() {
    let mut state = new_state();
    apply_delta(
        &mut state,
        Delta::LoggedIn {
            token: "not-a-jwt".to_string(),
        },
    );
    assert!(state.session.is_none());
    assert!(state.alert.is_some());
    assert_eq!(state.screen, Screen::Auth);
}

#[test]
fn auth_expired_tears_the_session_down() {
    let mut state = new_state();
    apply_delta(
        &mut state,
        Delta::LoggedIn {
            token: token("User", Some("p1")),
        },
    );
    state.navigate(Screen::Competition {
        id: "c1".to_string(),
    });

    apply_delta(&mut state, Delta::AuthExpired);
    assert!(state.session.is_none());
    assert_eq!(state.screen, Screen::Auth);
    assert!(state.alert.is_some());
    assert!(state.back.is_empty());
}

#[test]
fn page_delta_routes_to_the_right_table_and_drops_stale() {
    let mut state = new_state();
    let (current, _) = state.competitions.take_query().expect("armed");

    apply_delta(
        &mut state,
        Delta::Page {
            list: ListEndpoint::Competitions,
            request_id: current + 10,
            items: vec![json!({"id": "stale"})],
            total: 1,
        },
    );
    assert!(state.competitions.rows.is_empty());

    apply_delta(
        &mut state,
        Delta::Page {
            list: ListEndpoint::Competitions,
            request_id: current,
            items: vec![json!({"id": "c1", "name": "Spring open"})],
            total: 1,
        },
    );
    assert_eq!(state.competitions.rows.len(), 1);
    assert_eq!(state.competitions.total, 1);
    assert!(state.players.rows.is_empty());
}

#[test]
fn competition_delta_only_lands_when_its_screen_is_up() {
    let mut state = new_state();
    apply_delta(
        &mut state,
        Delta::Competition(Box::new(sample_competition("c1", CompetitionStatus::Organizing))),
    );
    assert!(state.competition.is_none());

    state.navigate(Screen::Competition {
        id: "c1".to_string(),
    });
    apply_delta(
        &mut state,
        Delta::Competition(Box::new(sample_competition("c1", CompetitionStatus::Organizing))),
    );
    let competition = state.competition.as_ref().expect("installed");
    assert_eq!(competition.name, "Spring open");
    assert_eq!(state.competition_competitors.rows.len(), 1);
}

#[test]
fn winners_install_for_the_competition_on_screen() {
    let mut state = new_state();
    state.navigate(Screen::Competition {
        id: "c1".to_string(),
    });
    apply_delta(
        &mut state,
        Delta::Winners {
            competition_id: "other".to_string(),
            items: vec![],
        },
    );
    apply_delta(
        &mut state,
        Delta::Winners {
            competition_id: "c1".to_string(),
            items: vec![CompetitorDisplay {
                id: "p1".to_string(),
                name: "A. Stone".to_string(),
                competitor_type: Some(CompetitorType::Player),
            }],
        },
    );
    assert_eq!(state.winners.len(), 1);
}

#[test]
fn dialog_done_closes_dialog_and_rearms_overview() {
    let mut state = new_state();
    apply_delta(
        &mut state,
        Delta::LoggedIn {
            token: token("Administrator", None),
        },
    );
    let _ = state.competitions.take_query();
    state.dialog = Some(forms::new_dialog(DialogKind::CreatePlayer));

    apply_delta(
        &mut state,
        Delta::DialogDone {
            message: "Player created".to_string(),
        },
    );
    assert!(state.dialog.is_none());
    assert!(state.competitions.is_dirty());
}

#[test]
fn game_type_options_reach_an_open_dialog() {
    let mut state = new_state();
    state.dialog = Some(forms::new_dialog(DialogKind::CreateGameFormat));
    apply_delta(
        &mut state,
        Delta::GameTypes(vec![GameType {
            id: "gt1".to_string(),
            name: "Darts".to_string(),
        }]),
    );
    let dialog = state.dialog.as_ref().expect("open");
    let options = dialog.options.get("gameType").expect("filled");
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].1, "Darts");
    assert_eq!(state.game_types.len(), 1);
}

#[test]
fn self_join_rule_checks_player_claim_and_roster() {
    let mut state = new_state();
    apply_delta(
        &mut state,
        Delta::LoggedIn {
            token: token("User", Some("p2")),
        },
    );
    state.navigate(Screen::Competition {
        id: "c1".to_string(),
    });
    apply_delta(
        &mut state,
        Delta::Competition(Box::new(sample_competition("c1", CompetitionStatus::Organizing))),
    );
    // p2 is not among the competitors, so joining is allowed.
    assert!(state.self_can_join_competition());

    apply_delta(
        &mut state,
        Delta::LoggedIn {
            token: token("User", Some("p1")),
        },
    );
    state.navigate(Screen::Competition {
        id: "c1".to_string(),
    });
    apply_delta(
        &mut state,
        Delta::Competition(Box::new(sample_competition("c1", CompetitionStatus::Organizing))),
    );
    // p1 is already entered.
    assert!(!state.self_can_join_competition());
    assert_eq!(state.session.as_ref().and_then(|s| s.player_id()), Some("p1"));
    assert_eq!(
        state.session.as_ref().map(|s| s.user.role),
        Some(UserRole::User)
    );
}

#[test]
fn log_ring_is_capped() {
    let mut state = new_state();
    for i in 0..300 {
        state.push_log(format!("line {i}"));
    }
    assert_eq!(state.logs.len(), 200);
    assert_eq!(state.logs.front().map(String::as_str), Some("line 100"));
}
