use arena_terminal::validation::{Condition, FieldSpec, FieldValue, Form, parse_stamp};

fn sample_form() -> Form {
    Form::new(vec![
        FieldSpec::text("email")
            .condition(Condition::required_text("Email is required!"))
            .condition(Condition::email("Enter a valid email address!")),
        FieldSpec::text("password")
            .condition(Condition::required_text("Password is required!"))
            .condition(Condition::min_text_len(
                3,
                "Password must be at least 3 characters long!",
            )),
        FieldSpec::new("count", FieldValue::Number(None)),
    ])
}

#[test]
fn pass_fails_iff_some_condition_trips() {
    let mut form = sample_form();
    assert!(!form.pass());
    assert_eq!(form.error("email"), Some("Email is required!"));

    form.set_value("email", FieldValue::Text("a@b.co".to_string()));
    form.set_value("password", FieldValue::Text("secret".to_string()));
    assert!(form.pass());
    assert!(form.first_error().is_none());
}

#[test]
fn first_matching_condition_in_order_wins() {
    let mut form = sample_form();
    // Empty trips both the required and the format condition; the required
    // message must win because it is declared first.
    assert!(!form.pass());
    assert_eq!(form.error("email"), Some("Email is required!"));

    form.set_value("email", FieldValue::Text("not-an-email".to_string()));
    assert!(!form.pass());
    assert_eq!(form.error("email"), Some("Enter a valid email address!"));
}

#[test]
fn set_value_clears_only_that_fields_error() {
    let mut form = sample_form();
    assert!(!form.pass());
    assert!(form.error("email").is_some());
    assert!(form.error("password").is_some());

    form.set_value("email", FieldValue::Text("a@b.co".to_string()));
    assert!(form.error("email").is_none());
    assert_eq!(form.error("password"), Some("Password is required!"));
}

#[test]
fn set_value_never_mutates_other_fields() {
    let mut form = sample_form();
    form.set_value("password", FieldValue::Text("hunter".to_string()));
    form.set_value("email", FieldValue::Text("a@b.co".to_string()));

    assert_eq!(form.value("password").map(|v| v.text().to_string()), Some("hunter".to_string()));
    assert_eq!(form.value("count").and_then(FieldValue::number), None);
}

#[test]
fn set_value_ignores_unknown_names() {
    let mut form = sample_form();
    form.set_value("nope", FieldValue::Text("x".to_string()));
    assert_eq!(form.len(), 3);
    assert!(form.value("nope").is_none());
}

#[test]
fn set_values_updates_several_fields_atomically() {
    let mut form = sample_form();
    assert!(!form.pass());
    form.set_values([
        ("email", FieldValue::Text("a@b.co".to_string())),
        ("count", FieldValue::Number(Some(4))),
    ]);
    assert!(form.error("email").is_none());
    assert_eq!(form.value("count").and_then(FieldValue::number), Some(4));
    // Password kept its failure from the earlier pass().
    assert!(form.error("password").is_some());
}

#[test]
fn reset_restores_defaults_and_clears_errors() {
    let mut form = sample_form();
    form.set_value("email", FieldValue::Text("not-an-email".to_string()));
    form.set_value("count", FieldValue::Number(Some(9)));
    assert!(!form.pass());

    form.reset();
    assert_eq!(form.value("email").map(|v| v.text().to_string()), Some(String::new()));
    assert_eq!(form.value("count").and_then(FieldValue::number), None);
    assert!(form.first_error().is_none());
    for (_, _, error) in form.entries() {
        assert!(error.is_none());
    }
}

#[test]
fn values_extracts_name_to_value_mapping() {
    let mut form = sample_form();
    form.set_value("email", FieldValue::Text("a@b.co".to_string()));
    let values = form.values();
    assert_eq!(values.len(), 3);
    assert_eq!(values.get("email").map(|v| v.text()), Some("a@b.co"));
    assert_eq!(values.get("count"), Some(&FieldValue::Number(None)));
}

#[test]
fn empty_form_always_passes() {
    let mut form = Form::new(Vec::new());
    assert!(form.pass());
    assert!(form.values().is_empty());
}

#[test]
fn rebuilding_discards_values_and_errors() {
    let mut form = sample_form();
    form.set_value("email", FieldValue::Text("kept?".to_string()));
    assert!(!form.pass());

    // The dependency-change analog: a fresh build from specs starts over.
    let form = sample_form();
    assert_eq!(form.value("email").map(|v| v.text().to_string()), Some(String::new()));
    assert!(form.first_error().is_none());
}

#[test]
fn number_conditions() {
    let mut form = Form::new(vec![
        FieldSpec::new("winAt", FieldValue::Number(None))
            .condition(Condition::required_number("Required!"))
            .condition(Condition::number_at_least(1, "Too small!")),
    ]);
    assert!(!form.pass());
    assert_eq!(form.error("winAt"), Some("Required!"));

    form.set_value("winAt", FieldValue::Number(Some(0)));
    assert!(!form.pass());
    assert_eq!(form.error("winAt"), Some("Too small!"));

    form.set_value("winAt", FieldValue::Number(Some(3)));
    assert!(form.pass());
}

#[test]
fn stamp_parsing_accepts_common_shapes() {
    assert!(parse_stamp("2026-05-01 18:00").is_some());
    assert!(parse_stamp("2026-05-01T18:00").is_some());
    assert!(parse_stamp("2026-05-01T18:00:30").is_some());
    assert!(parse_stamp("May first").is_none());
    assert!(parse_stamp("").is_none());
}

#[test]
fn stamp_conditions_flag_garbage_but_not_blank() {
    let mut form = Form::new(vec![
        FieldSpec::text("startTime").condition(Condition::valid_stamp("Bad date!")),
    ]);
    // Blank is the required condition's business, not the format's.
    assert!(form.pass());

    form.set_value("startTime", FieldValue::Text("tomorrowish".to_string()));
    assert!(!form.pass());
    assert_eq!(form.error("startTime"), Some("Bad date!"));
}
