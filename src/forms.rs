use serde_json::{Value, json};

use crate::dto::{EndMatchPayload, LoginPayload, RegisterPayload};
use crate::state::{AuthMode, Dialog, DialogKind, ProviderCommand, Screen};
use crate::validation::{Condition, FieldSpec, FieldValue, Form};

pub const COMPETITOR_TYPE_OPTIONS: [&str; 2] = ["PLAYER", "TEAM"];
pub const COMPETITION_TYPE_OPTIONS: [&str; 2] = ["ONE_VS_ALL", "TOURNAMENT"];

/// The auth form is rebuilt whenever the login/register toggle flips, which
/// drops all values and errors (the dependency-change behavior).
pub fn auth_form(mode: AuthMode) -> Form {
    let mut specs = vec![
        FieldSpec::text("email")
            .condition(Condition::required_text("Email is required!"))
            .condition(Condition::email("Enter a valid email address!")),
        FieldSpec::text("password")
            .condition(Condition::required_text("Password is required!"))
            .condition(Condition::min_text_len(
                3,
                "Password must be at least 3 characters long!",
            )),
    ];
    if mode == AuthMode::Register {
        specs.push(
            FieldSpec::text("firstName").condition(Condition::required_text(
                "First name is required!",
            )),
        );
        specs.push(
            FieldSpec::text("lastName")
                .condition(Condition::required_text("Last name is required!")),
        );
        specs.push(
            FieldSpec::text("username")
                .condition(Condition::required_text("Username is required!"))
                .condition(Condition::no_whitespace(
                    "Username must not contain white spaces!",
                )),
        );
    }
    Form::new(specs)
}

pub fn auth_command(mode: AuthMode, form: &Form) -> ProviderCommand {
    let values = form.values();
    let text = |name: &str| values.get(name).map(|v| v.text().to_string()).unwrap_or_default();
    match mode {
        AuthMode::Login => ProviderCommand::Login(LoginPayload {
            email: text("email"),
            password: text("password"),
        }),
        AuthMode::Register => ProviderCommand::Register(RegisterPayload {
            email: text("email"),
            password: text("password"),
            first_name: text("firstName"),
            last_name: text("lastName"),
            username: text("username"),
        }),
    }
}

pub fn new_dialog(kind: DialogKind) -> Dialog {
    let form = match kind {
        DialogKind::CreateCompetition => Form::new(vec![
            FieldSpec::text("name").condition(Condition::required_text("Name is required!")),
            FieldSpec::text("location")
                .condition(Condition::required_text("Location is required!")),
            FieldSpec::text("startTime")
                .condition(Condition::required_text("Choose a start time!"))
                .condition(Condition::valid_stamp(
                    "Enter a start time like 2026-05-01 18:00!",
                ))
                .condition(Condition::future_stamp("The chosen start time passed!")),
            FieldSpec::new("gameFormat", FieldValue::Choice(None))
                .condition(Condition::required_choice("Choose a game format!")),
            FieldSpec::new("breakInMinutes", FieldValue::Number(None)),
            FieldSpec::new("competitionType", FieldValue::Choice(None)).condition(
                Condition::required_choice("Choose the type of the competition!"),
            ),
        ]),
        DialogKind::CreatePlayer | DialogKind::CreateTeam => Form::new(vec![
            FieldSpec::text("name").condition(Condition::required_text("Name is required!")),
        ]),
        DialogKind::CreateGameFormat => Form::new(vec![
            FieldSpec::text("name").condition(Condition::required_text("Name is required!")),
            FieldSpec::new("gameType", FieldValue::Choice(None))
                .condition(Condition::required_choice("Choose a game type!")),
            FieldSpec::new("competitorType", FieldValue::Choice(None))
                .condition(Condition::required_choice("Choose the competitor type!")),
            FieldSpec::new("teamSize", FieldValue::Number(None)),
            FieldSpec::new("winAt", FieldValue::Number(None)),
            FieldSpec::new("durationInMinutes", FieldValue::Number(None)),
        ]),
        DialogKind::RegisterCompetitor => Form::new(vec![
            FieldSpec::new("competitor", FieldValue::Choice(None))
                .condition(Condition::required_choice("Choose a competitor!")),
        ]),
        DialogKind::AddTeamMember => Form::new(vec![
            FieldSpec::new("player", FieldValue::Choice(None))
                .condition(Condition::required_choice("Choose a player!")),
        ]),
        DialogKind::EndMatch => Form::new(vec![
            FieldSpec::new("competitorOnePoints", FieldValue::Number(Some(0)))
                .condition(Condition::required_number("Enter the first score!"))
                .condition(Condition::number_at_least(0, "Scores cannot be negative!")),
            FieldSpec::new("competitorTwoPoints", FieldValue::Number(Some(0)))
                .condition(Condition::required_number("Enter the second score!"))
                .condition(Condition::number_at_least(0, "Scores cannot be negative!")),
        ]),
        DialogKind::AddPoint => Form::new(vec![
            FieldSpec::new("value", FieldValue::Number(Some(1)))
                .condition(Condition::required_number("Enter a value!"))
                .condition(Condition::number_at_least(1, "Value must be positive!")),
        ]),
    };

    let mut dialog = Dialog::new(kind, form);
    match kind {
        DialogKind::CreateCompetition => {
            dialog.options.insert("competitionType", static_options(&COMPETITION_TYPE_OPTIONS));
        }
        DialogKind::CreateGameFormat => {
            dialog.options.insert("competitorType", static_options(&COMPETITOR_TYPE_OPTIONS));
        }
        _ => {}
    }
    dialog
}

fn static_options(labels: &[&str]) -> Vec<(String, String)> {
    labels
        .iter()
        .map(|label| (label.to_string(), label.to_string()))
        .collect()
}

pub fn dialog_title(kind: DialogKind) -> &'static str {
    match kind {
        DialogKind::CreateCompetition => "Create competition",
        DialogKind::CreatePlayer => "Create player",
        DialogKind::CreateTeam => "Create team",
        DialogKind::CreateGameFormat => "Create game format",
        DialogKind::RegisterCompetitor => "Register competitor",
        DialogKind::AddTeamMember => "Add team member",
        DialogKind::EndMatch => "End match",
        DialogKind::AddPoint => "Add point value",
    }
}

/// Maps a passing dialog onto the command it submits. Cross-field rules that
/// the per-field conditions cannot express surface as `Err(message)`.
pub fn dialog_command(dialog: &Dialog, screen: &Screen) -> Result<ProviderCommand, String> {
    let form = &dialog.form;
    match dialog.kind {
        DialogKind::CreateCompetition => {
            let game_format =
                chosen_id(dialog, "gameFormat").ok_or("Choose a game format!")?;
            let competition_type =
                chosen_id(dialog, "competitionType").ok_or("Choose the type of the competition!")?;
            let start = crate::validation::parse_stamp(&text(form, "startTime"))
                .ok_or("Choose a start time!")?;
            let body = json!({
                "name": text(form, "name"),
                "location": text(form, "location"),
                "startTime": start.format("%Y-%m-%dT%H:%M:%S").to_string(),
                "breakInMinutes": form.value("breakInMinutes").and_then(FieldValue::number),
                "competitionType": competition_type,
                "gameFormat": game_format,
            });
            if competition_type == "ONE_VS_ALL" {
                Ok(ProviderCommand::CreateOneVsAllCompetition(body))
            } else {
                Ok(ProviderCommand::CreateTournamentCompetition(body))
            }
        }
        DialogKind::CreatePlayer => Ok(ProviderCommand::CreatePlayer(name_body(form))),
        DialogKind::CreateTeam => Ok(ProviderCommand::CreateTeam(name_body(form))),
        DialogKind::CreateGameFormat => {
            let game_type = chosen_id(dialog, "gameType").ok_or("Choose a game type!")?;
            let competitor_type =
                chosen_id(dialog, "competitorType").ok_or("Choose the competitor type!")?;
            let win_at = form.value("winAt").and_then(FieldValue::number);
            let duration = form.value("durationInMinutes").and_then(FieldValue::number);
            if win_at.is_none() && duration.is_none() {
                return Err("Select at least one match win criteria!".to_string());
            }
            // Team size only applies to team formats, and never below two.
            let team_size = if competitor_type == "TEAM" {
                Some(
                    form.value("teamSize")
                        .and_then(FieldValue::number)
                        .unwrap_or(2)
                        .max(2),
                )
            } else {
                None
            };
            let body = json!({
                "name": text(form, "name"),
                "gameType": game_type,
                // The service takes the competitor type as an enum ordinal.
                "competitorType": if competitor_type == "PLAYER" { 0 } else { 1 },
                "teamSize": team_size,
                "winAt": win_at,
                "durationInMinutes": duration,
            });
            Ok(ProviderCommand::CreateGameFormat(body))
        }
        DialogKind::RegisterCompetitor => {
            let Screen::Competition { id } = screen else {
                return Err("No competition on screen".to_string());
            };
            let competitor = chosen_id(dialog, "competitor").ok_or("Choose a competitor!")?;
            Ok(ProviderCommand::AddCompetitor {
                competition_id: id.clone(),
                competitor_id: Some(competitor),
            })
        }
        DialogKind::AddTeamMember => {
            let Screen::Competitor { id } = screen else {
                return Err("No team on screen".to_string());
            };
            let player = chosen_id(dialog, "player").ok_or("Choose a player!")?;
            Ok(ProviderCommand::AddTeamMember {
                team_id: id.clone(),
                player_id: Some(player),
            })
        }
        DialogKind::EndMatch => {
            let Screen::Match { id } = screen else {
                return Err("No match on screen".to_string());
            };
            let one = form
                .value("competitorOnePoints")
                .and_then(FieldValue::number)
                .ok_or("Enter the first score!")?;
            let two = form
                .value("competitorTwoPoints")
                .and_then(FieldValue::number)
                .ok_or("Enter the second score!")?;
            Ok(ProviderCommand::EndMatch {
                id: id.clone(),
                payload: EndMatchPayload {
                    competitor_one_points: one,
                    competitor_two_points: two,
                },
            })
        }
        DialogKind::AddPoint => {
            let Screen::Match { id } = screen else {
                return Err("No match on screen".to_string());
            };
            let player_id = dialog.aux.clone().ok_or("No player selected")?;
            let value = form
                .value("value")
                .and_then(FieldValue::number)
                .ok_or("Enter a value!")?;
            Ok(ProviderCommand::AddPoint {
                match_id: id.clone(),
                player_id,
                value,
            })
        }
    }
}

/// The command that primes a freshly opened dialog's choice lists, if any.
/// Registering a competitor offers players or teams depending on what kind
/// of competition is on screen.
pub fn dialog_prefetch(
    kind: DialogKind,
    screen: &Screen,
    competition_kind: Option<crate::dto::CompetitorType>,
) -> Option<ProviderCommand> {
    use crate::dto::CompetitorType;
    use crate::state::ChoiceSource;
    match kind {
        DialogKind::CreateCompetition => Some(ProviderCommand::FetchGameFormatChoices),
        DialogKind::CreateGameFormat => Some(ProviderCommand::FetchGameTypes),
        DialogKind::RegisterCompetitor => {
            let Screen::Competition { id } = screen else {
                return None;
            };
            let source = match competition_kind {
                Some(CompetitorType::Team) => ChoiceSource::TeamsForCompetition,
                _ => ChoiceSource::PlayersNotInCompetition,
            };
            Some(ProviderCommand::FetchChoices {
                source,
                id: id.clone(),
            })
        }
        DialogKind::AddTeamMember => {
            let Screen::Competitor { id } = screen else {
                return None;
            };
            Some(ProviderCommand::FetchChoices {
                source: ChoiceSource::PlayersNotInTeam,
                id: id.clone(),
            })
        }
        _ => None,
    }
}

fn text(form: &Form, name: &str) -> String {
    form.value(name).map(|v| v.text().to_string()).unwrap_or_default()
}

fn name_body(form: &Form) -> Value {
    json!({ "name": text(form, "name") })
}

/// Resolves a choice field's selected index against the dialog's option list.
fn chosen_id(dialog: &Dialog, field: &str) -> Option<String> {
    let index = dialog.form.value(field)?.choice()?;
    dialog
        .options
        .get(field)
        .and_then(|options| options.get(index))
        .map(|(id, _)| id.clone())
}
