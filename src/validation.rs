use std::collections::HashMap;

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email regex")
});

/// The value union a form field can hold. Text covers free input (dates are
/// typed as text and parsed by their conditions), Choice is an index into a
/// caller-supplied option list.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(Option<i64>),
    Choice(Option<usize>),
}

impl FieldValue {
    pub fn text(&self) -> &str {
        match self {
            FieldValue::Text(text) => text,
            _ => "",
        }
    }

    pub fn number(&self) -> Option<i64> {
        match self {
            FieldValue::Number(value) => *value,
            _ => None,
        }
    }

    pub fn choice(&self) -> Option<usize> {
        match self {
            FieldValue::Choice(value) => *value,
            _ => None,
        }
    }
}

/// Accepts "2026-05-01 18:00" style input, with or without the T separator
/// and seconds.
pub fn parse_stamp(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ];
    let trimmed = text.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
}

/// One predicate plus the message shown when it trips. Conditions are checked
/// in declaration order; the first active one supplies the field's error.
pub struct Condition {
    check: Box<dyn Fn(&FieldValue) -> bool + Send>,
    message: String,
}

impl Condition {
    pub fn new(
        message: impl Into<String>,
        check: impl Fn(&FieldValue) -> bool + Send + 'static,
    ) -> Self {
        Self {
            check: Box::new(check),
            message: message.into(),
        }
    }

    pub fn required_text(message: impl Into<String>) -> Self {
        Self::new(message, |value| value.text().trim().is_empty())
    }

    pub fn min_text_len(len: usize, message: impl Into<String>) -> Self {
        Self::new(message, move |value| value.text().trim().len() < len)
    }

    pub fn no_whitespace(message: impl Into<String>) -> Self {
        Self::new(message, |value| value.text().trim().contains(' '))
    }

    pub fn email(message: impl Into<String>) -> Self {
        Self::new(message, |value| !EMAIL_RE.is_match(value.text()))
    }

    pub fn required_choice(message: impl Into<String>) -> Self {
        Self::new(message, |value| value.choice().is_none())
    }

    pub fn required_number(message: impl Into<String>) -> Self {
        Self::new(message, |value| value.number().is_none())
    }

    pub fn number_at_least(min: i64, message: impl Into<String>) -> Self {
        Self::new(message, move |value| {
            value.number().is_some_and(|n| n < min)
        })
    }

    pub fn valid_stamp(message: impl Into<String>) -> Self {
        Self::new(message, |value| {
            !value.text().trim().is_empty() && parse_stamp(value.text()).is_none()
        })
    }

    pub fn future_stamp(message: impl Into<String>) -> Self {
        Self::new(message, |value| {
            parse_stamp(value.text()).is_some_and(|stamp| stamp < chrono::Local::now().naive_local())
        })
    }
}

pub struct FieldSpec {
    pub name: &'static str,
    pub default: FieldValue,
    pub conditions: Vec<Condition>,
}

impl FieldSpec {
    pub fn new(name: &'static str, default: FieldValue) -> Self {
        Self {
            name,
            default,
            conditions: Vec::new(),
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, FieldValue::Text(String::new()))
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}

struct Field {
    spec: FieldSpec,
    value: FieldValue,
    error: Option<String>,
}

/// Field-level validation state: current value and first-failing-condition
/// message per field. Rebuilding with a new spec list (the dependency-change
/// analog, e.g. switching login/register) discards all state.
pub struct Form {
    fields: Vec<Field>,
}

impl Form {
    pub fn new(specs: Vec<FieldSpec>) -> Self {
        let fields = specs
            .into_iter()
            .map(|spec| Field {
                value: spec.default.clone(),
                error: None,
                spec,
            })
            .collect();
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Sets one field's value and clears only that field's error. Unknown
    /// names are ignored.
    pub fn set_value(&mut self, name: &str, value: FieldValue) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.spec.name == name) {
            field.value = value;
            field.error = None;
        }
    }

    /// Sets several fields atomically, same clearing rule as `set_value`.
    pub fn set_values<'a>(&mut self, pairs: impl IntoIterator<Item = (&'a str, FieldValue)>) {
        for (name, value) in pairs {
            self.set_value(name, value);
        }
    }

    /// Runs every field's condition list against its current value and marks
    /// failing fields. Returns true iff no condition tripped anywhere.
    pub fn pass(&mut self) -> bool {
        let mut ok = true;
        for field in &mut self.fields {
            field.error = field
                .spec
                .conditions
                .iter()
                .find(|condition| (condition.check)(&field.value))
                .map(|condition| condition.message.clone());
            if field.error.is_some() {
                ok = false;
            }
        }
        ok
    }

    /// Every field back to its declared default, all errors cleared.
    pub fn reset(&mut self) {
        for field in &mut self.fields {
            field.value = field.spec.default.clone();
            field.error = None;
        }
    }

    /// Plain name-to-value mapping for submission.
    pub fn values(&self) -> HashMap<&'static str, FieldValue> {
        self.fields
            .iter()
            .map(|field| (field.spec.name, field.value.clone()))
            .collect()
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.spec.name == name)
            .map(|field| &field.value)
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.spec.name == name)
            .and_then(|field| field.error.as_deref())
    }

    pub fn first_error(&self) -> Option<&str> {
        self.fields.iter().find_map(|field| field.error.as_deref())
    }

    /// Declaration-order view for rendering: (name, value, error).
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &FieldValue, Option<&str>)> {
        self.fields
            .iter()
            .map(|field| (field.spec.name, &field.value, field.error.as_deref()))
    }

    pub fn name_at(&self, index: usize) -> Option<&'static str> {
        self.fields.get(index).map(|field| field.spec.name)
    }
}
