use arena_terminal::forms::{auth_command, auth_form, dialog_command, new_dialog};
use arena_terminal::state::{AuthMode, DialogKind, ProviderCommand, Screen};
use arena_terminal::validation::FieldValue;

#[test]
fn login_form_carries_only_credentials() {
    let form = auth_form(AuthMode::Login);
    assert_eq!(form.len(), 2);
    assert!(form.value("username").is_none());

    let form = auth_form(AuthMode::Register);
    assert_eq!(form.len(), 5);
    assert!(form.value("username").is_some());
}

#[test]
fn register_conditions_enforce_username_rules() {
    let mut form = auth_form(AuthMode::Register);
    form.set_values([
        ("email", FieldValue::Text("a@b.co".to_string())),
        ("password", FieldValue::Text("secret".to_string())),
        ("firstName", FieldValue::Text("Ada".to_string())),
        ("lastName", FieldValue::Text("Stone".to_string())),
        ("username", FieldValue::Text("ada stone".to_string())),
    ]);
    assert!(!form.pass());
    assert_eq!(
        form.error("username"),
        Some("Username must not contain white spaces!")
    );

    form.set_value("username", FieldValue::Text("adastone".to_string()));
    assert!(form.pass());
}

#[test]
fn auth_command_builds_the_right_payload() {
    let mut form = auth_form(AuthMode::Login);
    form.set_values([
        ("email", FieldValue::Text("a@b.co".to_string())),
        ("password", FieldValue::Text("secret".to_string())),
    ]);
    match auth_command(AuthMode::Login, &form) {
        ProviderCommand::Login(payload) => {
            assert_eq!(payload.email, "a@b.co");
            assert_eq!(payload.password, "secret");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn create_competition_routes_on_competition_type() {
    let mut dialog = new_dialog(DialogKind::CreateCompetition);
    dialog
        .options
        .insert("gameFormat", vec![("gf1".to_string(), "Darts classic".to_string())]);
    dialog.form.set_values([
        ("name", FieldValue::Text("Spring open".to_string())),
        ("location", FieldValue::Text("Main hall".to_string())),
        ("startTime", FieldValue::Text("2030-05-01 18:00".to_string())),
        ("gameFormat", FieldValue::Choice(Some(0))),
        ("competitionType", FieldValue::Choice(Some(0))),
    ]);
    assert!(dialog.form.pass());

    let screen = Screen::Overview;
    match dialog_command(&dialog, &screen).expect("valid") {
        ProviderCommand::CreateOneVsAllCompetition(body) => {
            assert_eq!(body["name"], "Spring open");
            assert_eq!(body["gameFormat"], "gf1");
            assert_eq!(body["competitionType"], "ONE_VS_ALL");
            assert_eq!(body["startTime"], "2030-05-01T18:00:00");
            assert!(body["breakInMinutes"].is_null());
        }
        other => panic!("unexpected command: {other:?}"),
    }

    dialog
        .form
        .set_value("competitionType", FieldValue::Choice(Some(1)));
    match dialog_command(&dialog, &screen).expect("valid") {
        ProviderCommand::CreateTournamentCompetition(body) => {
            assert_eq!(body["competitionType"], "TOURNAMENT");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn game_format_requires_some_win_criteria() {
    let mut dialog = new_dialog(DialogKind::CreateGameFormat);
    dialog
        .options
        .insert("gameType", vec![("gt1".to_string(), "Darts".to_string())]);
    dialog.form.set_values([
        ("name", FieldValue::Text("Darts 501".to_string())),
        ("gameType", FieldValue::Choice(Some(0))),
        ("competitorType", FieldValue::Choice(Some(0))),
    ]);
    assert!(dialog.form.pass());
    let err = dialog_command(&dialog, &Screen::Overview).expect_err("no criteria picked");
    assert!(err.contains("win criteria"));

    dialog.form.set_value("winAt", FieldValue::Number(Some(501)));
    match dialog_command(&dialog, &Screen::Overview).expect("valid") {
        ProviderCommand::CreateGameFormat(body) => {
            assert_eq!(body["winAt"], 501);
            // PLAYER goes over the wire as ordinal 0, with no team size.
            assert_eq!(body["competitorType"], 0);
            assert!(body["teamSize"].is_null());
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn team_formats_send_ordinal_and_clamped_team_size() {
    let mut dialog = new_dialog(DialogKind::CreateGameFormat);
    dialog
        .options
        .insert("gameType", vec![("gt1".to_string(), "Darts".to_string())]);
    dialog.form.set_values([
        ("name", FieldValue::Text("Team darts".to_string())),
        ("gameType", FieldValue::Choice(Some(0))),
        ("competitorType", FieldValue::Choice(Some(1))),
        ("teamSize", FieldValue::Number(Some(1))),
        ("durationInMinutes", FieldValue::Number(Some(30))),
    ]);
    assert!(dialog.form.pass());
    match dialog_command(&dialog, &Screen::Overview).expect("valid") {
        ProviderCommand::CreateGameFormat(body) => {
            assert_eq!(body["competitorType"], 1);
            assert_eq!(body["teamSize"], 2);
            assert_eq!(body["durationInMinutes"], 30);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn register_competitor_needs_a_competition_screen() {
    let mut dialog = new_dialog(DialogKind::RegisterCompetitor);
    dialog
        .options
        .insert("competitor", vec![("p5".to_string(), "V. Ash".to_string())]);
    dialog.form.set_value("competitor", FieldValue::Choice(Some(0)));
    assert!(dialog.form.pass());

    assert!(dialog_command(&dialog, &Screen::Overview).is_err());

    let screen = Screen::Competition {
        id: "c1".to_string(),
    };
    match dialog_command(&dialog, &screen).expect("valid") {
        ProviderCommand::AddCompetitor {
            competition_id,
            competitor_id,
        } => {
            assert_eq!(competition_id, "c1");
            assert_eq!(competitor_id.as_deref(), Some("p5"));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn end_match_collects_both_scores() {
    let mut dialog = new_dialog(DialogKind::EndMatch);
    dialog.form.set_values([
        ("competitorOnePoints", FieldValue::Number(Some(11))),
        ("competitorTwoPoints", FieldValue::Number(Some(7))),
    ]);
    assert!(dialog.form.pass());
    let screen = Screen::Match {
        id: "m1".to_string(),
    };
    match dialog_command(&dialog, &screen).expect("valid") {
        ProviderCommand::EndMatch { id, payload } => {
            assert_eq!(id, "m1");
            assert_eq!(payload.competitor_one_points, 11);
            assert_eq!(payload.competitor_two_points, 7);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn add_point_uses_the_dialog_aux_player() {
    let mut dialog = new_dialog(DialogKind::AddPoint);
    dialog.aux = Some("p2".to_string());
    assert!(dialog.form.pass(), "default value of 1 should pass");
    let screen = Screen::Match {
        id: "m1".to_string(),
    };
    match dialog_command(&dialog, &screen).expect("valid") {
        ProviderCommand::AddPoint {
            match_id,
            player_id,
            value,
        } => {
            assert_eq!(match_id, "m1");
            assert_eq!(player_id, "p2");
            assert_eq!(value, 1);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn negative_scores_fail_validation() {
    let mut dialog = new_dialog(DialogKind::EndMatch);
    dialog
        .form
        .set_value("competitorOnePoints", FieldValue::Number(None));
    assert!(!dialog.form.pass());
    assert_eq!(
        dialog.form.error("competitorOnePoints"),
        Some("Enter the first score!")
    );
}
